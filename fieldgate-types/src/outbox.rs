/// One pending broker delivery held in the local outbox.
///
/// Records are removed once a publish succeeds, so a stored record normally
/// has `delivered == false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxRecord {
    pub id: i64,
    pub content: String,
    pub delivered: bool,
}
