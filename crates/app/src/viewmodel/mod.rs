//! Session and view controller
//!
//! A [`Session`] owns the current view, the signed-in user and the transient
//! chat state. All transitions go through [`Session::enter`], which also
//! starts and stops the usage timer so it runs only while the chat view is
//! showing for a metered account.
//!
//! Lock order: session state before database. Never the reverse.

mod admin;
mod auth;
mod chat;
mod payment;
mod support;

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use hydra_core::{Ad, AdRotation, Plan, SupportLog, SupportMessage, UsageMeter, User};
use tracing::{error, info};

use crate::state::AppState;
use crate::timer::RepeatingTask;

pub use admin::{AdminPanel, AdminStats};
pub use chat::{ChatMessage, ChatRole, SendOutcome, TickReport};
pub use payment::{PaymentForm, PlanOffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Splash,
    Auth,
    Plans,
    Payment,
    Blocked,
    Admin,
    Chat,
    Support,
}

/// Where a freshly authenticated user lands
pub fn route_for(user: &User, free_ceiling_seconds: u32) -> View {
    if user.is_admin {
        View::Admin
    } else if user.is_awaiting_approval() {
        View::Blocked
    } else if user.has_exhausted_free_usage(free_ceiling_seconds) {
        View::Plans
    } else {
        View::Chat
    }
}

#[derive(Debug)]
struct SessionState {
    view: View,
    user: Option<User>,
    selected_plan: Option<Plan>,
    transcript: Vec<ChatMessage>,
    meter: Option<UsageMeter>,
    rotation: Option<AdRotation>,
    current_ad: Option<Ad>,
    support_thread: Vec<SupportMessage>,
    busy: bool,
    /// Bumped on logout so in-flight replies for an old session are dropped
    epoch: u64,
}

impl SessionState {
    fn new(view: View, epoch: u64) -> Self {
        Self {
            view,
            user: None,
            selected_plan: None,
            transcript: Vec::new(),
            meter: None,
            rotation: None,
            current_ad: None,
            support_thread: Vec::new(),
            busy: false,
            epoch,
        }
    }
}

struct Shared {
    app: Arc<AppState>,
    state: Mutex<SessionState>,
    timer: Mutex<Option<RepeatingTask>>,
}

/// One user-facing session. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl Session {
    /// New session on the splash view
    pub fn new(app: Arc<AppState>) -> Self {
        Self {
            shared: Arc::new(Shared {
                app,
                state: Mutex::new(SessionState::new(View::Splash, 0)),
                timer: Mutex::new(None),
            }),
        }
    }

    pub fn app(&self) -> &Arc<AppState> {
        &self.shared.app
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn view(&self) -> View {
        self.lock().view
    }

    pub fn current_user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    /// Leave the splash screen
    pub fn finish_splash(&self) {
        if self.view() == View::Splash {
            self.enter(View::Auth);
        }
    }

    /// Switch views, refreshing the support thread and the usage timer
    fn enter(&self, view: View) {
        self.stop_usage_timer();

        let (email, start_timer) = {
            let mut state = self.lock();
            if state.view != view {
                info!(from = ?state.view, to = ?view, "View transition");
            }
            state.view = view;
            let metered = state.meter.as_ref().is_some_and(|m| !m.is_exhausted());
            (
                state.user.as_ref().map(|u| u.email.clone()),
                view == View::Chat && metered,
            )
        };

        if matches!(view, View::Chat | View::Support) {
            if let Some(email) = email {
                self.reload_support_thread(&email);
            }
        }

        if start_timer {
            self.start_usage_timer();
        }
    }

    fn reload_support_thread(&self, email: &str) {
        let thread = {
            let db = self.shared.app.db();
            SupportLog::new(&*db).list_for(email)
        };
        match thread {
            Ok(messages) => self.lock().support_thread = messages,
            Err(e) => error!(error = %e, "Failed to load support thread"),
        }
    }

    fn start_usage_timer(&self) {
        let period = Duration::from_millis(self.shared.app.config.usage.tick_millis.max(1));
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let task = RepeatingTask::spawn(period, move || {
            let Some(shared) = weak.upgrade() else {
                return ControlFlow::Break(());
            };
            let session = Session { shared };
            match session.usage_tick() {
                Ok(report) if report.ceiling_reached => ControlFlow::Break(()),
                Ok(_) => ControlFlow::Continue(()),
                Err(e) => {
                    error!(error = %e, "Usage tick failed");
                    ControlFlow::Continue(())
                }
            }
        });
        *self.shared.timer.lock().unwrap_or_else(PoisonError::into_inner) = task;
    }

    fn stop_usage_timer(&self) {
        let task = self
            .shared
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut task) = task {
            task.stop();
        }
    }

    pub fn is_usage_timer_running(&self) -> bool {
        self.shared
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(RepeatingTask::is_running)
    }
}
