use std::sync::Arc;

use hydra_app::viewmodel::PaymentForm;
use hydra_app::{AppState, Session, View};
use hydra_core::{AdminBootstrap, HydraConfig, Plan};
use tempfile::tempdir;

fn config(dir: &std::path::Path) -> HydraConfig {
    let mut config = HydraConfig::default();
    config.storage.path = Some(dir.join("data").join("hydra.db"));
    config.admin = Some(AdminBootstrap {
        email: "owner@hydra.dev".into(),
        secret: "owner-secret".into(),
        name: "Owner".into(),
    });
    config
}

#[test]
fn upgrade_is_approved_and_survives_restart() {
    let dir = tempdir().unwrap();

    {
        let app = Arc::new(AppState::new(config(dir.path())).unwrap());

        let user = Session::new(app.clone());
        user.finish_splash();
        assert_eq!(user.register("ana@example.com", "pw").unwrap(), View::Chat);
        for _ in 0..15 {
            user.usage_tick().unwrap();
        }
        user.open_plans().unwrap();
        user.select_plan(Plan::Basic).unwrap();
        user.submit_payment(&PaymentForm {
            proof: "data:image/png;base64,AAAA".into(),
            source: "YouTube".into(),
            creator: None,
            coupon: Some("HYDRA10".into()),
        })
        .unwrap();
        user.logout();
        assert_eq!(user.login("ana@example.com", "pw").unwrap(), View::Blocked);
        user.logout();

        let admin = Session::new(app);
        assert_eq!(admin.login("owner@hydra.dev", "owner-secret").unwrap(), View::Admin);
        let mut panel = admin.admin_panel().unwrap();
        assert_eq!(panel.stats().pending, 1);
        panel.approve("ana@example.com").unwrap();
    }

    let app = Arc::new(AppState::new(config(dir.path())).unwrap());
    let user = Session::new(app);
    assert_eq!(user.login("ana@example.com", "pw").unwrap(), View::Chat);

    let stored = user.current_user().unwrap();
    assert_eq!(stored.plan, Plan::Basic);
    assert_eq!(stored.usage_seconds, 15);
    assert_eq!(stored.coupon_code.as_deref(), Some("HYDRA10"));
    assert!(user.remaining_free_time().is_none());
}

#[test]
fn bootstrap_email_cannot_be_registered() {
    let dir = tempdir().unwrap();
    let app = Arc::new(AppState::new(config(dir.path())).unwrap());
    let session = Session::new(app);
    assert!(session.register("OWNER@hydra.dev", "guess").is_err());
    assert!(session.login("owner@hydra.dev", "guess").is_err());
}
