use crate::state::messages::DrawEvent;
use knockout_bracket::draw::{DrawSequence, finalize_draw};
use log::debug;
use rand::Rng;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Reveals a draw one team at a time, pausing between teams.
/// Stops early if the receiver goes away.
pub struct DrawRevealer<R> {
    sequence: DrawSequence<R>,
    events: mpsc::Sender<DrawEvent>,
    pause: Duration,
}

impl<R: Rng + Send + 'static> DrawRevealer<R> {
    pub fn new(sequence: DrawSequence<R>, events: mpsc::Sender<DrawEvent>, pause: Duration) -> Self {
        Self { sequence, events, pause }
    }

    pub async fn run(self) {
        let Self { mut sequence, events, pause } = self;

        for state in sequence.by_ref() {
            sleep(pause).await;
            if events.send(DrawEvent::Revealed(state)).await.is_err() {
                debug!("draw abandoned before completion");
                return;
            }
        }

        let event = match finalize_draw(&sequence.state().selected_teams) {
            Ok(order) => DrawEvent::Finished(order),
            Err(e) => DrawEvent::Failed(e.to_string()),
        };
        if events.send(event).await.is_err() {
            debug!("draw finished after its receiver went away");
        }
    }
}
