//! Login, registration and logout

use hydra_core::{AccountService, AdRotation, AdBoard, Result, UsageMeter, User};
use tracing::{error, info, instrument, warn};

use super::{route_for, Session, SessionState, View};

impl Session {
    /// Authenticate and route to the user's landing view
    #[instrument(skip(self, secret))]
    pub fn login(&self, email: &str, secret: &str) -> Result<View> {
        let app = self.app().clone();
        let user = {
            let db = app.db();
            AccountService::new(&*db, app.config.admin.as_ref()).authenticate(email, secret)?
        };
        Ok(self.begin(user))
    }

    /// Create a free account and sign straight in
    #[instrument(skip(self, secret))]
    pub fn register(&self, email: &str, secret: &str) -> Result<View> {
        let app = self.app().clone();
        let user = {
            let db = app.db();
            AccountService::new(&*db, app.config.admin.as_ref()).register(email, secret)?
        };
        Ok(self.begin(user))
    }

    fn begin(&self, user: User) -> View {
        let app = self.app().clone();
        let policy = app.config.usage;

        let rotation = if user.is_free() {
            let db = app.db();
            match AdBoard::new(&*db, app.config.ads.default_interval_seconds).config() {
                Ok(config) => Some(AdRotation::new(&config)),
                Err(e) => {
                    warn!(error = %e, "Ads unavailable for this session");
                    None
                }
            }
        } else {
            None
        };

        // A still-active previous session is closed first
        self.end_session();

        let view = route_for(&user, policy.free_ceiling_seconds);
        info!(email = %user.email, ?view, "Signed in");
        {
            let mut state = self.lock();
            state.meter = UsageMeter::start(&user, policy);
            state.rotation = rotation;
            state.user = Some(user);
        }
        self.enter(view);
        view
    }

    /// End the session: flush metered usage and discard transient state
    pub fn logout(&self) {
        self.end_session();
        self.enter(View::Auth);
    }

    /// Stop the timer, flush pending usage and reset transient state.
    /// Bumps the epoch so replies still in flight are dropped.
    fn end_session(&self) {
        self.stop_usage_timer();

        let meter = {
            let mut state = self.lock();
            if let Some(user) = &state.user {
                info!(email = %user.email, "Signed out");
            }
            let meter = state.meter.take();
            let view = state.view;
            let epoch = state.epoch + 1;
            *state = SessionState::new(view, epoch);
            meter
        };

        if let Some(mut meter) = meter {
            let db = self.app().db();
            if let Err(e) = meter.flush(&*db) {
                error!(error = %e, "Failed to flush usage on sign-out");
            }
        }
    }
}
