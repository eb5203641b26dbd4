//! Support overlay over the chat view

use hydra_core::{support::has_admin_reply, Error, Result, SupportLog, SupportMessage};
use tracing::instrument;

use super::{Session, View};

impl Session {
    /// Open the support overlay. Usage is not counted while it is open.
    pub fn open_support(&self) -> Result<()> {
        if self.view() != View::Chat {
            return Err(Error::InvalidOperation("Support opens from the chat.".into()));
        }
        self.enter(View::Support);
        Ok(())
    }

    pub fn close_support(&self) -> Result<()> {
        if self.view() != View::Support {
            return Err(Error::InvalidOperation("Support is not open.".into()));
        }
        self.enter(View::Chat);
        Ok(())
    }

    /// Post to the signed-in user's support thread
    #[instrument(skip_all)]
    pub fn send_support(&self, text: &str) -> Result<Option<SupportMessage>> {
        let email = self
            .current_user()
            .map(|u| u.email)
            .ok_or_else(|| Error::InvalidOperation("Sign in first.".into()))?;

        let posted = {
            let db = self.app().db();
            SupportLog::new(&*db).post(&email, text, false)?
        };
        if posted.is_some() {
            self.reload_support_thread(&email);
        }
        Ok(posted)
    }

    /// The user's thread as of the last refresh
    pub fn support_thread(&self) -> Vec<SupportMessage> {
        self.lock().support_thread.clone()
    }

    /// True when the thread holds any administrator reply
    pub fn has_unread_reply(&self) -> bool {
        has_admin_reply(&self.lock().support_thread)
    }
}
