use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};

use crate::core::dsl::inflect::{camelize, pluralize, singularize};
use crate::core::dsl::Namespace;
use crate::core::Step;

/// Where a step was declared, as far as discovery can tell.
#[derive(Debug, Clone)]
pub struct DeclarationRecord {
    /// `None` for generated steps.
    pub source_file: Option<String>,
    pub line: Option<u32>,
    pub step: Step,
    pub is_composite: bool,
}

impl DeclarationRecord {
    fn new(step: &Step) -> Self {
        Self {
            source_file: step.location().file().map(str::to_string),
            line: step.location().line(),
            step: step.clone(),
            is_composite: step.is_chain(),
        }
    }
}

/// Registry queries standing in for a scan of source files.
///
/// One discovery belongs to one validation run. The per-file cache is never
/// invalidated, so build a new one after redefining steps.
pub struct Discovery {
    namespace: Namespace,
    root: Option<PathBuf>,
    component_folders: Vec<String>,
    records: Vec<DeclarationRecord>,
    by_file: RefCell<HashMap<String, Vec<DeclarationRecord>>>,
}

impl Discovery {
    pub fn new(namespace: &Namespace) -> Self {
        let records = namespace.steps().iter().map(DeclarationRecord::new).collect();
        Self {
            namespace: namespace.clone(),
            root: None,
            component_folders: vec!["interactors".to_string(), "organizers".to_string()],
            records,
            by_file: RefCell::new(HashMap::new()),
        }
    }

    /// The directory `resolve` strips from a path before naming it.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Leading folders that group steps by kind and are not part of their names.
    pub fn component_folders<I, S>(mut self, folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.component_folders = folders.into_iter().map(Into::into).collect();
        self
    }

    /// Every registered step, in registration order.
    pub fn records(&self) -> &[DeclarationRecord] {
        &self.records
    }

    /// Chains declared by user code.
    pub fn organizers(&self) -> impl Iterator<Item = &DeclarationRecord> {
        self.records
            .iter()
            .filter(|r| r.is_composite && !r.step.is_synthetic())
    }

    /// Leaves declared by user code.
    pub fn interactors(&self) -> impl Iterator<Item = &DeclarationRecord> {
        self.records
            .iter()
            .filter(|r| !r.is_composite && !r.step.is_synthetic())
    }

    pub fn organizer_files(&self) -> Vec<String> {
        files(self.organizers())
    }

    pub fn interactor_files(&self) -> Vec<String> {
        files(self.interactors())
    }

    /// The records declared in `file`, memoized for the life of this discovery.
    pub fn records_in_file(&self, file: &str) -> Vec<DeclarationRecord> {
        if let Some(cached) = self.by_file.borrow().get(file) {
            return cached.clone();
        }

        let found: Vec<DeclarationRecord> = self
            .records
            .iter()
            .filter(|r| r.source_file.as_deref() == Some(file))
            .cloned()
            .collect();
        self.by_file.borrow_mut().insert(file.to_string(), found.clone());
        found
    }

    /// Steps named `Outer::...` where `Outer` is the record's step, excluding
    /// generated ones.
    pub fn internal_records(&self, record: &DeclarationRecord) -> Vec<DeclarationRecord> {
        let prefix = format!("{}::", record.step.name());
        self.records
            .iter()
            .filter(|r| !r.step.is_synthetic() && r.step.name().starts_with(&prefix))
            .cloned()
            .collect()
    }

    /// Resolves a source path to the step its name says it declares.
    ///
    /// Resolution is best effort: a path outside the root, or one naming no
    /// registered step, yields `None`.
    pub fn resolve(&self, file: impl AsRef<Path>) -> Option<DeclarationRecord> {
        let file = file.as_ref();
        let root = self.root.as_deref().unwrap_or_else(|| Path::new(""));
        let folders: Vec<&str> = self.component_folders.iter().map(String::as_str).collect();

        let Some(name) = qualified_name_for_path(root, file, &folders) else {
            log::debug!("cannot derive a step name from {}", file.display());
            return None;
        };

        match self.namespace.get(&name) {
            Some(step) => Some(DeclarationRecord {
                source_file: Some(file.display().to_string()),
                ..DeclarationRecord::new(&step)
            }),
            None => {
                log::debug!("{} names {name}, which is not registered", file.display());
                None
            }
        }
    }

    /// Name → record for every registered step. Unregistered children (lambda
    /// leaves) have no entry.
    pub fn lookup_table(&self) -> HashMap<String, DeclarationRecord> {
        self.records
            .iter()
            .map(|r| (r.step.name().to_string(), r.clone()))
            .collect()
    }
}

fn files<'a>(records: impl Iterator<Item = &'a DeclarationRecord>) -> Vec<String> {
    records
        .filter_map(|r| r.source_file.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Derives `Outer::Inner` from `<root>/<component>/outer/inner.rs`.
///
/// `concerns` folders are dropped, as is a leading component folder. The
/// last segment is singularized unless the path itself reads as plural.
pub fn qualified_name_for_path(root: &Path, file: &Path, component_folders: &[&str]) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let mut segments: Vec<String> = relative
        .with_extension("")
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str().map(str::to_string),
            _ => None,
        })
        .filter(|part| part != "concerns")
        .collect();

    if segments.len() > 1 && component_folders.contains(&segments[0].as_str()) {
        segments.remove(0);
    }

    let underscored = segments.join("/");
    let file_name = relative.to_string_lossy();
    let last = segments.pop()?;

    let mut name = camelize(&segments.join("/"));
    if !name.is_empty() {
        name.push_str("::");
    }

    let mut klass = camelize(&singularize(&last));
    if file_name.contains(&pluralize(&underscored)) {
        klass = pluralize(&klass);
    }
    name.push_str(&klass);
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(path: &str) -> Option<String> {
        qualified_name_for_path(Path::new("app"), Path::new(path), &["interactors"])
    }

    #[test]
    fn test_path_to_name() {
        assert_eq!(
            name("app/interactors/organizing/outer_organizer.rs").as_deref(),
            Some("Organizing::OuterOrganizer")
        );
        assert_eq!(name("app/interactors/each/organizer.rs").as_deref(), Some("Each::Organizer"));
        assert_eq!(name("app/concerns/thing.rs").as_deref(), Some("Thing"));
        assert_eq!(name("app/interactors/things/thing.rs").as_deref(), Some("Things::Thing"));
        assert_eq!(name("app/interactors/people/person.rs").as_deref(), Some("People::Person"));
    }

    #[test]
    fn test_plural_file_names_stay_plural() {
        assert_eq!(
            name("app/interactors/unfulfilled_promises.rs").as_deref(),
            Some("UnfulfilledPromises")
        );
        assert_eq!(name("app/interactors/all_the_things.rs").as_deref(), Some("AllTheThings"));
    }

    #[test]
    fn test_paths_outside_root() {
        assert_eq!(name("elsewhere/thing.rs"), None);
    }

    #[test]
    fn test_resolve_and_internal_records() {
        let ns = Namespace::new();
        let outer = ns.organizer("Organizing::OuterOrganizer").build().unwrap();
        ns.leaf("Organizing::OuterOrganizer::Inner").build().unwrap();

        let discovery = Discovery::new(&ns).root("app");
        let record = discovery
            .resolve("app/interactors/organizing/outer_organizer.rs")
            .unwrap();
        assert!(record.step.ptr_eq(&outer));
        assert!(record.is_composite);

        let internal = discovery.internal_records(&record);
        assert_eq!(internal.len(), 1);
        assert_eq!(internal[0].step.name(), "Organizing::OuterOrganizer::Inner");

        assert!(discovery.resolve("app/interactors/organizing/missing.rs").is_none());
    }

    #[test]
    fn test_records_in_file_and_partitions() {
        let ns = Namespace::new();
        let one = ns.leaf("One").build().unwrap();
        ns.organizer("Outer").organize([one]).build().unwrap();

        let discovery = Discovery::new(&ns);
        let file = file!().to_string();
        assert_eq!(discovery.records_in_file(&file).len(), 2);
        assert_eq!(discovery.records_in_file(&file).len(), 2);
        assert_eq!(discovery.organizer_files(), vec![file.clone()]);
        assert_eq!(discovery.interactor_files(), vec![file]);
        assert_eq!(discovery.lookup_table().len(), 2);
    }
}
