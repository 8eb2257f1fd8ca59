/// Normalized change notification for a single directory entry. Hosts that
/// cannot distinguish a rename from a delete+create pair deliver the pair;
/// the engine tolerates both forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirEvent {
    Appeared(String),
    Disappeared(String),
    Renamed { old: String, new: String },
}

impl DirEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            DirEvent::Appeared(_) => "appeared",
            DirEvent::Disappeared(_) => "disappeared",
            DirEvent::Renamed { .. } => "renamed",
        }
    }
}
