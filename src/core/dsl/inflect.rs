//! English inflection for generated names and path resolution.

use cruet::string::pluralize::to_plural;
use cruet::string::singularize::to_singular;

/// `outer_organizer` → `OuterOrganizer`, `a/b` → `A::B`.
pub fn camelize(word: &str) -> String {
    word.split('/')
        .map(|segment| {
            segment
                .split('_')
                .filter(|part| !part.is_empty())
                .map(capitalize)
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("::")
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `things` → `thing`, `people` → `person`, `statuses` → `status`.
/// Uncountable words such as `series` come back unchanged.
pub fn singularize(word: &str) -> String {
    on_last_segment(word, to_singular)
}

/// Words that already read as plurals are returned unchanged. In a path
/// only the last segment is inflected: `things/thing` → `things/things`.
pub fn pluralize(word: &str) -> String {
    if is_plural(word) {
        return word.to_string();
    }
    on_last_segment(word, to_plural)
}

fn on_last_segment(word: &str, inflect: fn(&str) -> String) -> String {
    match word.rsplit_once('/') {
        Some((head, last)) => format!("{head}/{}", inflect(last)),
        None => inflect(word),
    }
}

fn is_plural(word: &str) -> bool {
    singularize(word) != word
}
