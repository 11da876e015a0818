use shared::UserRecord;

use crate::media::Validation;
use crate::workflow::RosterDiff;

pub fn format_roster(users: &[UserRecord]) -> String {
    if users.is_empty() {
        return "No users registered yet!".to_string();
    }

    let width = users
        .iter()
        .map(|u| u.username.chars().count())
        .max()
        .unwrap_or(0);

    users
        .iter()
        .enumerate()
        .map(|(index, user)| {
            let points = user
                .points
                .map(|p| format!("  {} pts", p))
                .unwrap_or_default();
            format!(
                "{:>3}. {:<width$}  {}{}",
                index + 1,
                user.username,
                user.display_name(),
                points,
                width = width
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_validation(file_name: &str, validation: &Validation) -> String {
    let dimensions = validation
        .dimensions
        .map(|(w, h)| format!(" ({}x{})", w, h))
        .unwrap_or_default();

    if validation.valid {
        format!("{}{} is ready to upload", file_name, dimensions)
    } else {
        format!(
            "{}{} cannot be uploaded: {}",
            file_name,
            dimensions,
            validation.reason.as_deref().unwrap_or("invalid file")
        )
    }
}

pub fn format_diff(diff: &RosterDiff) -> String {
    let mut lines = Vec::new();
    lines.extend(diff.added.iter().map(|name| format!("+ {}", name)));
    lines.extend(diff.removed.iter().map(|name| format!("- {}", name)));
    lines.join("\n")
}
