//! Readiness loop over the three button `value` attributes.
//!
//! sysfs signals a GPIO edge by raising `POLLPRI` on the `value` attribute.
//! Each button gets its own edge-triggered registration; the streams are
//! merged into one [`StreamMap`] keyed by [`ButtonId`], and the loop selects
//! between that and the shutdown token.

use std::{fs::File, io};

use anyhow::{Context, Result, bail};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use log::{debug, info};
use signal_hook::consts::{SIGINT, SIGTERM};
use tokio::{
    io::{Interest, unix::AsyncFd},
    signal::unix::{SignalKind, signal},
    task::JoinHandle,
};
use tokio_stream::StreamMap;
use tokio_util::sync::CancellationToken;

use crate::{
    board::Board,
    controller::{ButtonId, Controller, Outputs},
};

/// Merged readiness notifications of all buttons.
pub type ButtonEvents = StreamMap<ButtonId, BoxStream<'static, io::Result<()>>>;

/// Registers every button with the reactor.
///
/// Each `value` attribute is read once first: sysfs reports a descriptor that
/// has not read the latest value as ready, which would produce a spurious
/// wake-up right after registration.
pub fn watch_buttons(board: &Board) -> Result<ButtonEvents> {
    let mut events = StreamMap::new();

    for id in ButtonId::ALL {
        let button = board.button(id);
        let level = button.sample()?;
        debug!("{id} ({button}) drained, level {level}");

        let fd = AsyncFd::with_interest(button.watch_handle()?, Interest::PRIORITY)
            .with_context(|| format!("failed to register {button} for edge events"))?;
        events.insert(id, readiness(fd).boxed());
    }

    Ok(events)
}

fn readiness(fd: AsyncFd<File>) -> impl Stream<Item = io::Result<()>> {
    stream::unfold(fd, |fd| async move {
        let result = match fd.ready(Interest::PRIORITY).await {
            Ok(mut guard) => {
                guard.clear_ready();
                Ok(())
            }
            Err(e) => Err(e),
        };
        Some((result, fd))
    })
}

/// Cancels `shutdown` on the first SIGTERM or SIGINT.
///
/// The handlers are installed before this returns, so a signal arriving
/// during initialization is not lost.
pub fn spawn_signal_listener(shutdown: CancellationToken) -> Result<JoinHandle<()>> {
    let mut terminate =
        signal(SignalKind::from_raw(SIGTERM)).context("failed to install SIGTERM handler")?;
    let mut interrupt =
        signal(SignalKind::from_raw(SIGINT)).context("failed to install SIGINT handler")?;

    Ok(tokio::spawn(async move {
        let signum = tokio::select! {
            _ = terminate.recv() => SIGTERM,
            _ = interrupt.recv() => SIGINT,
        };
        info!("Received signal {signum}, terminating...");
        shutdown.cancel();
    }))
}

/// Dispatches button events to `controller` until `shutdown` is cancelled.
///
/// Cancellation is checked before every event, so nothing is written once
/// shutdown has started. A reactor error or a frequency push failure ends the
/// loop with an error.
pub async fn run<S>(
    controller: &mut Controller,
    outputs: &mut dyn Outputs,
    mut events: S,
    shutdown: CancellationToken,
) -> Result<()>
where
    S: Stream<Item = (ButtonId, io::Result<()>)> + Unpin,
{
    loop {
        tokio::select! {
            biased;

            () = shutdown.cancelled() => {
                info!("Leaving event loop");
                return Ok(());
            }

            event = events.next() => match event {
                Some((id, Ok(()))) => {
                    controller.on_button(id, outputs)?;
                }
                Some((id, Err(e))) => {
                    return Err(e).with_context(|| format!("epoll_wait failed on {id}"));
                }
                None => bail!("button event streams ended"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blink_control::{Mode, Period},
        board::tests::fake_system,
        controller::tests::{Call, FakeOutputs},
    };
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::time::Duration;

    fn controller() -> Controller {
        Controller::new(Period::from_millis(500).unwrap(), Mode::Automatic)
    }

    /// Yields `ids` then stays pending forever, like an idle reactor.
    fn scripted(ids: Vec<ButtonId>) -> impl Stream<Item = (ButtonId, io::Result<()>)> + Unpin {
        stream::iter(ids.into_iter().map(|id| (id, Ok(())))).chain(stream::pending())
    }

    fn cancel_soon(token: &CancellationToken) {
        let token = token.clone();
        tokio::spawn(async move { token.cancel() });
    }

    #[tokio::test]
    async fn events_are_dispatched_until_shutdown() {
        let mut controller = controller();
        let mut io = FakeOutputs::default();
        let shutdown = CancellationToken::new();
        cancel_soon(&shutdown);

        let events = scripted(vec![
            ButtonId::Zero,
            ButtonId::Zero,
            ButtonId::One,
            ButtonId::One,
            ButtonId::Two,
            ButtonId::Two,
        ]);
        run(&mut controller, &mut io, events, shutdown).await.unwrap();

        assert_eq!(controller.period().as_nanos(), 500_000_000);
        assert_eq!(controller.mode(), Mode::Manual);
        assert_eq!(
            io.frequency_writes(),
            vec!["4".to_string(), "2".to_string()]
        );
        assert_eq!(io.mode_writes(), vec!["0"]);
        assert_eq!(io.led_writes().len(), 6);
    }

    #[tokio::test]
    async fn nothing_is_written_after_shutdown() {
        let mut controller = controller();
        let mut io = FakeOutputs::default();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let events = scripted(vec![ButtonId::Zero, ButtonId::Two]);
        run(&mut controller, &mut io, events, shutdown).await.unwrap();

        assert!(io.calls.is_empty());
        assert_eq!(controller.period().as_nanos(), 500_000_000);
    }

    #[tokio::test]
    async fn reactor_error_ends_the_loop() {
        let mut controller = controller();
        let mut io = FakeOutputs::default();

        let events = stream::iter(vec![
            (ButtonId::Zero, Ok(())),
            (ButtonId::Two, Err(io::Error::other("EBADF"))),
        ])
        .chain(stream::pending());
        let err = run(&mut controller, &mut io, events, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("button2"));
        assert_eq!(io.frequency_writes(), vec!["4".to_string()]);
    }

    #[tokio::test]
    async fn frequency_failure_ends_the_loop() {
        let mut controller = controller();
        let mut io = FakeOutputs {
            fail_frequency: true,
            ..Default::default()
        };

        let result = run(
            &mut controller,
            &mut io,
            scripted(vec![ButtonId::Zero]),
            CancellationToken::new(),
        )
        .await;

        assert!(result.is_err());
        assert!(io.led_writes().is_empty());
    }

    #[tokio::test]
    async fn exhausted_streams_are_an_error() {
        let mut controller = controller();
        let mut io = FakeOutputs::default();

        let events = stream::iter(vec![(ButtonId::Two, Ok(()))]);
        let result = run(&mut controller, &mut io, events, CancellationToken::new()).await;

        assert!(result.is_err());
        assert_eq!(io.mode_writes(), vec!["0"]);
    }

    #[tokio::test]
    async fn stream_map_tags_events_with_button() {
        let mut map: StreamMap<ButtonId, BoxStream<'static, io::Result<()>>> = StreamMap::new();
        map.insert(ButtonId::One, stream::once(async { Ok(()) }).boxed());

        let mut controller = controller();
        let mut io = FakeOutputs::default();
        let shutdown = CancellationToken::new();
        cancel_soon(&shutdown);

        // StreamMap ends once its only stream is done, so chain a pending tail.
        let events = map.chain(stream::pending());
        run(&mut controller, &mut io, events, shutdown).await.unwrap();

        assert_eq!(io.calls[0], Call::Sample(ButtonId::Two));
        assert_eq!(controller.period().as_nanos(), 1_000_000_000);
    }

    #[tokio::test]
    async fn regular_files_cannot_be_watched() {
        // epoll refuses regular files, so a fake sysfs tree fails registration
        // after the drain read.
        let (_gpio, _misc, config) = fake_system();
        let board = Board::open(&config).unwrap();

        let err = watch_buttons(&board).err().unwrap();
        assert!(format!("{err:#}").contains("edge events"));
    }

    #[tokio::test]
    #[serial]
    async fn sigterm_cancels_the_token() {
        let shutdown = CancellationToken::new();
        let listener = spawn_signal_listener(shutdown.clone()).unwrap();

        signal_hook::low_level::raise(SIGTERM).unwrap();

        tokio::time::timeout(Duration::from_secs(5), shutdown.cancelled())
            .await
            .unwrap();
        listener.await.unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn sigint_cancels_the_token() {
        let shutdown = CancellationToken::new();
        let listener = spawn_signal_listener(shutdown.clone()).unwrap();

        signal_hook::low_level::raise(SIGINT).unwrap();

        tokio::time::timeout(Duration::from_secs(5), shutdown.cancelled())
            .await
            .unwrap();
        listener.await.unwrap();
    }
}
