use knockout_bracket::draw::{DrawState, TeamOrder};

/// Progress of a draw as it is revealed to the user.
#[derive(Debug, Clone)]
pub enum DrawEvent {
    Revealed(DrawState),
    Finished(TeamOrder),
    Failed(String),
}
