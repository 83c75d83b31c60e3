use std::time::{SystemTime, UNIX_EPOCH};

/// Millisecond-timestamp entry ids that never repeat within a session, even
/// when two entries are saved inside the same millisecond.
#[derive(Debug, Default)]
pub(crate) struct EntryIdGenerator {
    last: u128,
}

impl EntryIdGenerator {
    pub(crate) fn next_id(&mut self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        self.next_id_at(now)
    }

    fn next_id_at(&mut self, now_millis: u128) -> String {
        let id = now_millis.max(self.last + 1);
        self.last = id;
        id.to_string()
    }
}
