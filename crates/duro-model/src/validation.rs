//! Declared-field validation
//!
//! The schema is expected to reject malformed resources before they reach
//! the operator. These checks catch what slips through so that a bad
//! resource fails the pass loudly instead of publishing a broken entry.

use crate::category::Category;
use crate::entry::{effective_priority, MIN_PRIORITY};
use crate::resource::DashboardApp;

/// A declared field that fails validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Resource has no name
    #[error("resource name is empty")]
    MissingName,

    /// A required spec field is empty
    #[error("{resource}: spec.{field} is required")]
    MissingField {
        resource: String,
        field: &'static str,
    },

    /// No visibility groups declared
    #[error("{resource}: spec.groups must contain at least one group")]
    NoGroups { resource: String },

    /// A blank entry in the groups list
    #[error("{resource}: spec.groups[{index}] is empty")]
    BlankGroup { resource: String, index: usize },

    /// Priority below the minimum after defaulting
    #[error("{resource}: spec.priority {priority} is below the minimum of {min}")]
    PriorityOutOfRange {
        resource: String,
        priority: i32,
        min: i32,
    },
}

impl ValidationError {
    /// Name of the offending resource, if known
    #[must_use]
    pub fn resource(&self) -> Option<&str> {
        match self {
            Self::MissingName => None,
            Self::MissingField { resource, .. }
            | Self::NoGroups { resource }
            | Self::BlankGroup { resource, .. }
            | Self::PriorityOutOfRange { resource, .. } => Some(resource),
        }
    }
}

/// Validate one resource's declared fields
///
/// Unknown categories are not rejected here; they sort after every known
/// category.
///
/// # Errors
/// Returns the first failing check
pub fn validate(app: &DashboardApp) -> Result<(), ValidationError> {
    let resource = app.name();
    if resource.trim().is_empty() {
        return Err(ValidationError::MissingName);
    }

    let spec = &app.spec;
    for (field, value) in [
        ("name", &spec.name),
        ("url", &spec.url),
        ("category", &spec.category),
        ("icon", &spec.icon),
    ] {
        if value.trim().is_empty() {
            return Err(ValidationError::MissingField {
                resource: resource.to_string(),
                field,
            });
        }
    }

    if spec.groups.is_empty() {
        return Err(ValidationError::NoGroups {
            resource: resource.to_string(),
        });
    }
    if let Some(index) = spec.groups.iter().position(|g| g.trim().is_empty()) {
        return Err(ValidationError::BlankGroup {
            resource: resource.to_string(),
            index,
        });
    }

    let priority = effective_priority(spec.priority);
    if priority < MIN_PRIORITY {
        return Err(ValidationError::PriorityOutOfRange {
            resource: resource.to_string(),
            priority,
            min: MIN_PRIORITY,
        });
    }

    Ok(())
}

/// Validate a whole collection, stopping at the first invalid resource
///
/// # Errors
/// Returns the error of the first invalid resource in input order
pub fn validate_all<'a>(apps: impl IntoIterator<Item = &'a DashboardApp>) -> Result<(), ValidationError> {
    apps.into_iter().try_for_each(validate)
}

/// Whether the category is part of the known set
#[must_use]
pub fn is_known_category(category: &str) -> bool {
    category.parse::<Category>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::DashboardAppSpec;

    fn valid() -> DashboardApp {
        DashboardApp::new(
            "gitea",
            DashboardAppSpec {
                name: "Gitea".to_string(),
                url: "https://git.example.com".to_string(),
                category: "development".to_string(),
                icon: "<svg/>".to_string(),
                groups: vec!["devs".to_string()],
                priority: 20,
            },
        )
    }

    #[test]
    fn accepts_valid_resource() {
        assert_eq!(validate(&valid()), Ok(()));
    }

    #[test]
    fn accepts_unset_priority() {
        let mut app = valid();
        app.spec.priority = 0;
        assert_eq!(validate(&app), Ok(()));
    }

    #[test]
    fn rejects_empty_url() {
        let mut app = valid();
        app.spec.url = "  ".to_string();
        assert_eq!(
            validate(&app),
            Err(ValidationError::MissingField {
                resource: "gitea".to_string(),
                field: "url"
            })
        );
    }

    #[test]
    fn rejects_missing_groups() {
        let mut app = valid();
        app.spec.groups.clear();
        let err = validate(&app).unwrap_err();
        assert!(matches!(err, ValidationError::NoGroups { .. }));
        assert_eq!(err.resource(), Some("gitea"));
    }

    #[test]
    fn rejects_blank_group() {
        let mut app = valid();
        app.spec.groups.push(String::new());
        assert!(matches!(
            validate(&app),
            Err(ValidationError::BlankGroup { index: 1, .. })
        ));
    }

    #[test]
    fn rejects_negative_priority() {
        let mut app = valid();
        app.spec.priority = -5;
        assert!(matches!(
            validate(&app),
            Err(ValidationError::PriorityOutOfRange { priority: -5, .. })
        ));
    }

    #[test]
    fn unknown_category_passes_validation() {
        let mut app = valid();
        app.spec.category = "games".to_string();
        assert_eq!(validate(&app), Ok(()));
        assert!(!is_known_category("games"));
    }

    #[test]
    fn validate_all_reports_first_offender() {
        let mut bad = valid();
        bad.metadata.name = "broken".to_string();
        bad.spec.icon.clear();
        let apps = vec![valid(), bad];
        let err = validate_all(&apps).unwrap_err();
        assert_eq!(err.resource(), Some("broken"));
    }
}
