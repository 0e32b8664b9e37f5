use super::ignore::Ignore;
use super::state::Violation;

/// Renders one violation.
pub fn format_violation(violation: &Violation) -> String {
    let keys = violation
        .missing
        .iter()
        .map(|field| format!(":{field}"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Missing keys: {keys}\n expected in: {}\n   called by: {}",
        violation.step.name(),
        violation.called_by.name()
    )
}

/// Renders every violation not matched by `ignore`, separated by blank lines.
/// Identical blocks are rendered once. Empty when nothing is left.
pub fn format_report<'a>(violations: impl IntoIterator<Item = &'a Violation>, ignore: &Ignore) -> String {
    let mut blocks: Vec<String> = Vec::new();
    for violation in violations {
        if ignore.matches(&violation.step) {
            log::debug!("ignoring violation in {}", violation.step.name());
            continue;
        }
        let block = format_violation(violation);
        if !blocks.contains(&block) {
            blocks.push(block);
        }
    }
    blocks.join("\n\n")
}

/// Exit code convention for command line wrappers.
pub fn exit_code(report: &str) -> i32 {
    if report.is_empty() { 0 } else { 1 }
}
