//! Participant identity and publish name derivation

/// Number of id characters used when a participant has no display label
pub const SHORT_ID_LEN: usize = 8;

/// Opaque identity of a call participant
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First [`SHORT_ID_LEN`] characters of the id
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(SHORT_ID_LEN) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ParticipantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&ParticipantId> for ParticipantId {
    fn from(id: &ParticipantId) -> Self {
        id.clone()
    }
}

/// Build the name a participant is published under
///
/// `<prefix>-<label>`, falling back to the shortened participant id when the
/// label is missing or blank. A non-blank label is used verbatim.
pub fn publish_name(prefix: &str, display_label: Option<&str>, participant: &ParticipantId) -> String {
    let suffix = display_label
        .filter(|label| !label.trim().is_empty())
        .unwrap_or_else(|| participant.short());
    format!("{}-{}", prefix, suffix)
}
