//! Permission guards for dashboard elements.
//!
//! A [`Guard`] decides how a permission-gated element is presented:
//!
//! | Behavior  | Unauthorized result                                  |
//! |-----------|------------------------------------------------------|
//! | `Hide`    | the fallback (default: nothing)                      |
//! | `Disable` | the element, non-interactive, with a title           |
//! | `Lock`    | as `Disable`, plus a lock indicator                  |
//!
//! Evaluation is synchronous over an already-fetched permission snapshot.
//! While the session is still loading, every guard renders nothing.

use crate::permission::{has_permission, PermissionSet, Requirement};
use crate::session::SessionState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_RESTRICTION_TITLE: &str = "You do not have permission to perform this action";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardBehavior {
    #[default]
    Hide,
    Disable,
    Lock,
}

impl GuardBehavior {
    pub fn as_str(self) -> &'static str {
        match self {
            GuardBehavior::Hide => "hide",
            GuardBehavior::Disable => "disable",
            GuardBehavior::Lock => "lock",
        }
    }
}

impl fmt::Display for GuardBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GuardBehavior {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "hide" => Ok(GuardBehavior::Hide),
            "disable" => Ok(GuardBehavior::Disable),
            "lock" => Ok(GuardBehavior::Lock),
            other => Err(format!("unknown guard behavior: {other}")),
        }
    }
}

/// An element a guard can wrap.
pub trait Guardable {
    /// Whether the element can be shown in a disabled state.
    fn supports_disabled(&self) -> bool {
        false
    }
}

impl Guardable for String {}

/// What to present for a guarded element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome<T> {
    Render(T),
    Fallback(Option<T>),
    Disabled { element: T, title: String },
    Locked { element: T, title: String },
}

impl<T> GuardOutcome<T> {
    pub fn is_rendered(&self) -> bool {
        matches!(self, GuardOutcome::Render(_))
    }

    /// The element or fallback shown, if any.
    pub fn shown(&self) -> Option<&T> {
        match self {
            GuardOutcome::Render(element)
            | GuardOutcome::Disabled { element, .. }
            | GuardOutcome::Locked { element, .. } => Some(element),
            GuardOutcome::Fallback(fallback) => fallback.as_ref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Guard<T> {
    requirement: Requirement,
    behavior: GuardBehavior,
    fallback: Option<T>,
    title: String,
}

impl<T: Guardable> Guard<T> {
    pub fn new(requirement: impl Into<Requirement>) -> Self {
        Self {
            requirement: requirement.into(),
            behavior: GuardBehavior::default(),
            fallback: None,
            title: DEFAULT_RESTRICTION_TITLE.to_string(),
        }
    }

    pub fn behavior(mut self, behavior: GuardBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Shown instead of the element when `Hide` denies access.
    pub fn fallback(mut self, fallback: T) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    /// Evaluates the guard against a permission snapshot.
    pub fn evaluate(self, element: T, permissions: Option<&PermissionSet>) -> GuardOutcome<T> {
        if has_permission(permissions, &self.requirement) {
            return GuardOutcome::Render(element);
        }

        let behavior = match self.behavior {
            // Elements without a disabled state cannot be disabled; hide them.
            GuardBehavior::Disable | GuardBehavior::Lock if !element.supports_disabled() => {
                GuardBehavior::Hide
            }
            behavior => behavior,
        };

        match behavior {
            GuardBehavior::Hide => GuardOutcome::Fallback(self.fallback),
            GuardBehavior::Disable => GuardOutcome::Disabled {
                element,
                title: self.title,
            },
            GuardBehavior::Lock => GuardOutcome::Locked {
                element,
                title: self.title,
            },
        }
    }

    /// Evaluates the guard against session state. `Loading` renders nothing.
    pub fn evaluate_state(self, element: T, state: &SessionState) -> GuardOutcome<T> {
        if state.is_loading() {
            return GuardOutcome::Fallback(None);
        }
        self.evaluate(element, state.permissions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::Capability;
    use crate::session::Session;
    use crate::role::{Profile, Role};

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Button(&'static str);

    impl Guardable for Button {
        fn supports_disabled(&self) -> bool {
            true
        }
    }

    fn media_viewer() -> PermissionSet {
        PermissionSet::from_granted([Capability::MediaView])
    }

    #[test]
    fn test_authorized_renders_children() {
        let set = media_viewer();
        for behavior in [GuardBehavior::Hide, GuardBehavior::Disable, GuardBehavior::Lock] {
            let outcome = Guard::new(Capability::MediaView)
                .behavior(behavior)
                .evaluate(Button("view"), Some(&set));
            assert_eq!(outcome, GuardOutcome::Render(Button("view")));
        }
    }

    #[test]
    fn test_hide_renders_fallback_exactly() {
        let set = media_viewer();
        let outcome = Guard::new(Capability::MediaUpload).evaluate(Button("upload"), Some(&set));
        assert_eq!(outcome, GuardOutcome::Fallback(None));
        assert!(outcome.shown().is_none());

        let outcome = Guard::new(Capability::MediaUpload)
            .fallback(Button("read-only"))
            .evaluate(Button("upload"), Some(&set));
        assert_eq!(outcome, GuardOutcome::Fallback(Some(Button("read-only"))));
        assert_eq!(outcome.shown(), Some(&Button("read-only")));
    }

    #[test]
    fn test_disable_and_lock_carry_title() {
        let outcome = Guard::new(Capability::UsersCreate)
            .behavior(GuardBehavior::Disable)
            .evaluate(Button("new user"), None);
        assert_eq!(
            outcome,
            GuardOutcome::Disabled {
                element: Button("new user"),
                title: DEFAULT_RESTRICTION_TITLE.to_string(),
            }
        );

        let outcome = Guard::new(Capability::UsersCreate)
            .behavior(GuardBehavior::Lock)
            .title("Admins only")
            .evaluate(Button("new user"), None);
        assert_eq!(
            outcome,
            GuardOutcome::Locked {
                element: Button("new user"),
                title: "Admins only".to_string(),
            }
        );
    }

    #[test]
    fn test_disable_without_disabled_state_hides() {
        let outcome = Guard::new(Capability::SettingsEdit)
            .behavior(GuardBehavior::Lock)
            .fallback("n/a".to_string())
            .evaluate("Settings".to_string(), None);
        assert_eq!(outcome, GuardOutcome::Fallback(Some("n/a".to_string())));
    }

    #[test]
    fn test_loading_renders_nothing() {
        let outcome = Guard::new(Capability::MediaView)
            .behavior(GuardBehavior::Lock)
            .fallback(Button("fallback"))
            .evaluate_state(Button("media"), &SessionState::Loading);
        assert_eq!(outcome, GuardOutcome::Fallback(None));
    }

    #[test]
    fn test_evaluate_active_state() {
        let session = Session::from_profile(Profile::with_role(Role::new("admin", PermissionSet::wildcard())));
        let state = SessionState::Active(session);
        let outcome = Guard::new([Capability::AuditView]).evaluate_state(Button("audit"), &state);
        assert!(outcome.is_rendered());

        let outcome = Guard::new(Capability::AuditView)
            .behavior(GuardBehavior::Disable)
            .evaluate_state(Button("audit"), &SessionState::SignedOut);
        assert!(matches!(outcome, GuardOutcome::Disabled { .. }));
    }

    #[test]
    fn test_behavior_parse() {
        assert_eq!("lock".parse::<GuardBehavior>(), Ok(GuardBehavior::Lock));
        assert!("blur".parse::<GuardBehavior>().is_err());
        assert_eq!(GuardBehavior::default(), GuardBehavior::Hide);
    }
}
