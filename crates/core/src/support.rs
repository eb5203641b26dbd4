//! Support ticket log
//!
//! Append-only. Users and the administrator post through the same call; the
//! admin view groups the log into one thread per user email.

use tracing::instrument;

use crate::error::Result;
use crate::invariants::assert_support_order;
use crate::models::{normalize_email, SupportMessage, SupportThread};
use crate::storage::SupportRepository;

pub struct SupportLog<'a, R: ?Sized> {
    repo: &'a R,
}

impl<'a, R> SupportLog<'a, R>
where
    R: SupportRepository + ?Sized,
{
    pub fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    /// Append a message to `email`'s thread. Blank text is ignored (`Ok(None)`).
    #[instrument(skip(self, text))]
    pub fn post(&self, email: &str, text: &str, is_admin_reply: bool) -> Result<Option<SupportMessage>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let message = self
            .repo
            .append_support_message(&normalize_email(email), text, is_admin_reply)?;
        Ok(Some(message))
    }

    /// One user's conversation, oldest first
    pub fn list_for(&self, email: &str) -> Result<Vec<SupportMessage>> {
        let messages = self.repo.list_support_messages_for(&normalize_email(email))?;
        assert_support_order(&messages);
        Ok(messages)
    }

    /// Every thread, ordered by each thread's first message
    pub fn threads(&self) -> Result<Vec<SupportThread>> {
        Ok(group_threads(self.repo.list_support_messages()?))
    }
}

/// Group a chronological log by sender email, preserving first-appearance order
pub fn group_threads(messages: Vec<SupportMessage>) -> Vec<SupportThread> {
    let mut threads: Vec<SupportThread> = Vec::new();
    for message in messages {
        match threads.iter_mut().find(|t| t.email == message.sender_email) {
            Some(thread) => thread.messages.push(message),
            None => threads.push(SupportThread {
                email: message.sender_email.clone(),
                messages: vec![message],
            }),
        }
    }
    threads
}

/// Display hint: any admin reply in the thread counts as "unread".
///
/// There are no read receipts, so this stays true once a reply exists.
pub fn has_admin_reply(messages: &[SupportMessage]) -> bool {
    messages.iter().any(|m| m.is_admin_reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[test]
    fn user_and_admin_turns_in_order() {
        let db = Database::open_in_memory().unwrap();
        let log = SupportLog::new(&db);

        log.post("ana@example.com", "hello", false).unwrap();
        log.post("ana@example.com", "hi back", true).unwrap();

        let thread: Vec<_> = log
            .list_for("ana@example.com")
            .unwrap()
            .into_iter()
            .map(|m| (m.text, m.is_admin_reply))
            .collect();
        assert_eq!(
            thread,
            vec![("hello".to_string(), false), ("hi back".to_string(), true)]
        );
    }

    #[test]
    fn blank_text_is_a_no_op() {
        let db = Database::open_in_memory().unwrap();
        let log = SupportLog::new(&db);

        assert!(log.post("ana@example.com", "   ", false).unwrap().is_none());
        assert!(log.list_for("ana@example.com").unwrap().is_empty());
    }

    #[test]
    fn threads_group_by_sender() {
        let db = Database::open_in_memory().unwrap();
        let log = SupportLog::new(&db);
        log.post("bob@example.com", "first", false).unwrap();
        log.post("ana@example.com", "second", false).unwrap();
        log.post("bob@example.com", "answer", true).unwrap();

        let threads = log.threads().unwrap();
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].email, "bob@example.com");
        assert_eq!(threads[0].messages.len(), 2);
        assert!(threads[0].has_admin_reply());
        assert!(!threads[1].has_admin_reply());
    }

    #[test]
    fn unread_hint_follows_admin_replies() {
        let db = Database::open_in_memory().unwrap();
        let log = SupportLog::new(&db);
        log.post("ana@example.com", "help", false).unwrap();
        assert!(!has_admin_reply(&log.list_for("ana@example.com").unwrap()));

        log.post("ana@example.com", "on it", true).unwrap();
        assert!(has_admin_reply(&log.list_for("ana@example.com").unwrap()));
    }
}
