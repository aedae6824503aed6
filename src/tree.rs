//! The decrypted database tree.
//!
//! A [`Database`] owns a single tree of [`Group`]s and [`Entry`]s built
//! during unlock. The tree is read only: navigation, lookup and rendering
//! never mutate it, so it can be shared freely between readers.
//!
//! Paths are absolute, `/`-separated and rooted at the synthetic root group
//! `/`. Child lookup is case-insensitive while rendering preserves the
//! original spelling and insertion order.

use crate::xml::decoders::keepass_epoch;
use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::collections::HashMap;
use uuid::Uuid;

/// A value for a field stored in an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A value that was encrypted with the inner stream cipher
    Protected(String),
    /// A value stored as plain text in the database XML
    Standard(String),
    /// An empty value
    Empty,
}

impl Default for Value {
    fn default() -> Value {
        Value::Empty
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
/// A key value pair
pub struct Field {
    pub(crate) key: String,
    pub(crate) value: Value,
}

impl Field {
    /// Key for this field
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Value for this field, if any
    pub fn value(&self) -> Option<&str> {
        match self.value {
            Value::Protected(ref s) | Value::Standard(ref s) => Some(s),
            Value::Empty => None,
        }
    }

    /// Whether this field was stored encrypted in the database
    pub fn protected(&self) -> bool {
        matches!(self.value, Value::Protected(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Audit times for a group or entry
pub struct Times {
    /// Time last edited
    pub last_modification_time: NaiveDateTime,
    /// Time created
    pub creation_time: NaiveDateTime,
    /// Time last accessed
    pub last_access_time: NaiveDateTime,
    /// Time at which this password needs rotation
    pub expiry_time: NaiveDateTime,
    /// Whether this password expires
    pub expires: bool,
    /// Count of usages with autofill functions
    pub usage_count: u32,
}

impl Default for Times {
    fn default() -> Times {
        let epoch = keepass_epoch();
        Times {
            last_modification_time: epoch,
            creation_time: epoch,
            last_access_time: epoch,
            expiry_time: epoch,
            expires: false,
            usage_count: 0,
        }
    }
}

#[derive(Debug, Default, Clone)]
/// A single password entry
pub struct Entry {
    pub(crate) uuid: Uuid,
    pub(crate) icon: Option<u32>,
    pub(crate) tags: String,
    pub(crate) fields: Vec<Field>,
    pub(crate) history: Vec<Entry>,
    pub(crate) times: Times,
}

impl Entry {
    /// Identifier for this entry
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Icon identifier, if one is set
    pub fn icon(&self) -> Option<u32> {
        self.icon
    }

    /// Comma separated tags for this entry
    pub fn tags(&self) -> &str {
        &self.tags
    }

    /// Iterate through all the fields of this entry
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Find a field in this entry with a given key
    pub fn find(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key == key)
    }

    fn find_string_value(&self, key: &str) -> Option<&str> {
        self.find(key).and_then(|f| f.value())
    }

    /// Return the title of this entry
    pub fn title(&self) -> Option<&str> {
        self.find_string_value("Title")
    }

    /// Return the username of this entry
    pub fn username(&self) -> Option<&str> {
        self.find_string_value("UserName")
    }

    /// Return the password of this entry
    ///
    /// Protected passwords have already been decrypted during load.
    pub fn password(&self) -> Option<&str> {
        self.find_string_value("Password")
    }

    /// Return the URL of this entry
    pub fn url(&self) -> Option<&str> {
        self.find_string_value("URL")
    }

    /// Return the notes of this entry
    pub fn notes(&self) -> Option<&str> {
        self.find_string_value("Notes")
    }

    /// Previous versions of this entry
    pub fn history(&self) -> impl Iterator<Item = &Entry> {
        self.history.iter()
    }

    /// Audit times for this entry
    pub fn times(&self) -> &Times {
        &self.times
    }

    fn title_or_empty(&self) -> &str {
        self.title().unwrap_or("")
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Entry) -> bool {
        self.uuid == other.uuid
    }
}

impl Eq for Entry {}

#[derive(Debug, Default, Clone)]
/// A group or folder of password entries and child groups
pub struct Group {
    pub(crate) uuid: Uuid,
    pub(crate) name: String,
    pub(crate) notes: String,
    pub(crate) icon: Option<u32>,
    pub(crate) path: String,
    pub(crate) times: Times,
    pub(crate) groups: Vec<Group>,
    pub(crate) entries: Vec<Entry>,
    group_index: HashMap<String, usize>,
    entry_index: HashMap<String, usize>,
}

impl Group {
    /// Identifier for this group
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Display name for this group, `/` for the root
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-form notes attached to this group
    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Icon identifier, if one is set
    pub fn icon(&self) -> Option<u32> {
        self.icon
    }

    /// Absolute path of this group from the database root
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Audit times for this group
    pub fn times(&self) -> &Times {
        &self.times
    }

    /// Iterate through the direct child groups in insertion order
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    /// Iterate through the direct entries in insertion order
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Count of direct child groups
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Count of direct entries
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Look up a direct child group by name, ignoring case
    pub fn group(&self, name: &str) -> Option<&Group> {
        self.group_index
            .get(&name.to_lowercase())
            .map(|&idx| &self.groups[idx])
    }

    /// Look up a direct entry by title, ignoring case
    pub fn entry(&self, title: &str) -> Option<&Entry> {
        self.entry_index
            .get(&title.to_lowercase())
            .map(|&idx| &self.entries[idx])
    }

    /// Whether a direct child group with this name exists, ignoring case
    pub fn has_group(&self, name: &str) -> bool {
        self.group_index.contains_key(&name.to_lowercase())
    }

    /// Whether a direct entry with this title exists, ignoring case
    pub fn has_entry(&self, title: &str) -> bool {
        self.entry_index.contains_key(&title.to_lowercase())
    }

    /// Names of the direct child groups, sorted without regard to case
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.iter().map(|g| g.name.clone()).collect();
        names.sort_by_key(|name| name.to_lowercase());
        names
    }

    /// Titles of the direct entries, sorted without regard to case
    pub fn entry_titles(&self) -> Vec<String> {
        let mut titles: Vec<String> = self
            .entries
            .iter()
            .map(|e| e.title_or_empty().to_string())
            .collect();
        titles.sort_by_key(|title| title.to_lowercase());
        titles
    }

    /// Render this subtree as an indented text block.
    ///
    /// Each level indents by two spaces. At level 0 the group is labelled
    /// with its full path, below that with its name. Passwords are masked
    /// unless `show_password` is set.
    pub fn details(&self, level: usize, show_password: bool) -> String {
        let mut out = String::new();
        self.render(&mut out, level, show_password);
        out
    }

    fn render(&self, out: &mut String, level: usize, show_password: bool) {
        let indent = "  ".repeat(level);
        let label = if level == 0 { self.path() } else { self.name() };
        out.push_str(&indent);
        out.push_str(label);
        out.push('\n');

        let entry_indent = "  ".repeat(level + 1);
        let field_indent = "  ".repeat(level + 2);
        for entry in &self.entries {
            out.push_str(&entry_indent);
            out.push_str(entry.title_or_empty());
            out.push('\n');
            if let Some(username) = entry.username() {
                out.push_str(&format!("{}Username: {}\n", field_indent, username));
            }
            if let Some(password) = entry.password() {
                let shown = if show_password { password } else { "****" };
                out.push_str(&format!("{}Password: {}\n", field_indent, shown));
            }
            if let Some(url) = entry.url() {
                out.push_str(&format!("{}URL: {}\n", field_indent, url));
            }
            if let Some(notes) = entry.notes() {
                out.push_str(&format!("{}Notes: {}\n", field_indent, notes));
            }
        }
        for group in &self.groups {
            group.render(out, level + 1, show_password);
        }
    }

    fn finalize(&mut self, path: String) {
        self.path = path;
        self.group_index = self
            .groups
            .iter()
            .enumerate()
            .map(|(idx, group)| (group.name.to_lowercase(), idx))
            .collect();
        self.entry_index = self
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.title_or_empty().to_lowercase(), idx))
            .collect();
        let prefix = if self.path == "/" {
            String::new()
        } else {
            self.path.clone()
        };
        for group in &mut self.groups {
            let child_path = format!("{}/{}", prefix, group.name);
            group.finalize(child_path);
        }
    }
}

impl PartialEq for Group {
    fn eq(&self, other: &Group) -> bool {
        self.uuid == other.uuid
    }
}

impl Eq for Group {}

impl PartialOrd for Group {
    fn partial_cmp(&self, other: &Group) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Group {
    fn cmp(&self, other: &Group) -> Ordering {
        self.name.to_lowercase().cmp(&other.name.to_lowercase())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
/// Meta information about the database
pub struct Meta {
    /// Application used to generate this database
    pub generator: String,
    /// Short name for the database
    pub database_name: String,
    /// Longer description of the database
    pub database_description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Decrypted password database
///
/// See the [module-level documentation][crate::tree] for more information.
pub struct Database {
    meta: Meta,
    root: Group,
}

impl Database {
    /// Finish construction after XML decoding.
    ///
    /// Renames the root to `/`, synthesizes every group's absolute path and
    /// builds the case-insensitive lookup indices. Where two siblings share
    /// a name the later one wins the lookup key; both stay in the ordered
    /// child list.
    pub(crate) fn assemble(meta: Meta, mut root: Group) -> Database {
        root.name = "/".into();
        root.finalize("/".into());
        Database { meta, root }
    }

    /// Meta information about the database
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Top level group of the database
    pub fn root(&self) -> &Group {
        &self.root
    }

    /// Resolve a path to a group.
    ///
    /// `input` may be absolute or relative to `cwd` (itself an absolute
    /// path). `.` and empty segments are no-ops, `..` ascends and clamps at
    /// the root, and name matching ignores case.
    pub fn find_group(&self, input: &str, cwd: &str) -> Option<&Group> {
        let path = absolute_path(input, cwd);
        let mut group = &self.root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            group = group.group(segment)?;
        }
        Some(group)
    }

    /// Complete a partially typed path.
    ///
    /// Splits `input` into a directory part and a final fragment. If the
    /// fragment exactly names a child group, the result re-roots into that
    /// group and lists all its children. Otherwise the result lists the
    /// children of the directory whose names start with the fragment,
    /// ignoring case. An unresolvable directory yields no matches.
    pub fn fuzzy_find(&self, input: &str, cwd: &str) -> (String, Vec<String>, Vec<String>) {
        let (dir, last) = match input.rfind('/') {
            Some(idx) => (&input[..idx + 1], &input[idx + 1..]),
            None => ("", input),
        };
        let base = match self.find_group(dir, cwd) {
            Some(group) => group,
            None => return (input.to_string(), Vec::new(), Vec::new()),
        };

        if !last.is_empty() {
            if let Some(group) = base.group(last) {
                let canonical = format!("{}{}/", dir, group.name());
                return (canonical, group.group_names(), group.entry_titles());
            }
        }

        let needle = last.to_lowercase();
        let groups = base
            .group_names()
            .into_iter()
            .filter(|name| name.to_lowercase().starts_with(&needle))
            .collect();
        let entries = base
            .entry_titles()
            .into_iter()
            .filter(|title| title.to_lowercase().starts_with(&needle))
            .collect();
        (input.to_string(), groups, entries)
    }
}

/// Join `input` onto `cwd` and normalize the result.
///
/// Absolute inputs ignore `cwd`. Repeated slashes and `.` segments are
/// dropped, `..` ascends and clamps at the root, and the result never ends
/// in a slash unless it is the root itself.
pub fn absolute_path(input: &str, cwd: &str) -> String {
    let joined = if input.starts_with('/') {
        input.to_string()
    } else {
        format!("{}/{}", cwd, input)
    };
    let mut stack: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            name => stack.push(name),
        }
    }
    if stack.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", stack.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, password: &str) -> Entry {
        Entry {
            fields: vec![
                Field {
                    key: "Title".into(),
                    value: Value::Standard(title.into()),
                },
                Field {
                    key: "UserName".into(),
                    value: Value::Standard("user".into()),
                },
                Field {
                    key: "Password".into(),
                    value: Value::Protected(password.into()),
                },
            ],
            ..Entry::default()
        }
    }

    fn group(name: &str, groups: Vec<Group>, entries: Vec<Entry>) -> Group {
        Group {
            name: name.into(),
            groups,
            entries,
            ..Group::default()
        }
    }

    fn sample_database() -> Database {
        let root = group(
            "ignored",
            vec![
                group(
                    "Alpha",
                    vec![group("Inner", Vec::new(), Vec::new())],
                    vec![entry("Sample", "pw")],
                ),
                group("Alfred", Vec::new(), Vec::new()),
                group("Beta", Vec::new(), Vec::new()),
            ],
            vec![entry("Top", "secret")],
        );
        Database::assemble(Meta::default(), root)
    }

    #[test]
    fn absolute_path_normalizes() {
        assert_eq!(absolute_path("/A/B", "/"), "/A/B");
        assert_eq!(absolute_path("B", "/A"), "/A/B");
        assert_eq!(absolute_path("//A//B/", "/"), "/A/B");
        assert_eq!(absolute_path("..", "/A/B"), "/A");
        assert_eq!(absolute_path("../../..", "/A"), "/");
        assert_eq!(absolute_path(".", "/A"), "/A");
        assert_eq!(absolute_path("", "/A"), "/A");
        assert_eq!(absolute_path("./B/../C", "/A"), "/A/C");
    }

    #[test]
    fn paths_are_synthesized() {
        let db = sample_database();
        assert_eq!(db.root().path(), "/");
        assert_eq!(db.root().name(), "/");
        let alpha = db.find_group("/Alpha", "/").unwrap();
        assert_eq!(alpha.path(), "/Alpha");
        let inner = db.find_group("/Alpha/Inner", "/").unwrap();
        assert_eq!(inner.path(), "/Alpha/Inner");
    }

    #[test]
    fn find_group_ignores_case_and_doubled_slashes() {
        let db = sample_database();
        let upper = db.find_group("/Alpha/Inner", "/").unwrap();
        let lower = db.find_group("/alpha/inner", "/").unwrap();
        assert_eq!(upper, lower);
        let doubled = db.find_group("//alpha//inner//", "/").unwrap();
        assert_eq!(upper, doubled);
    }

    #[test]
    fn find_group_resolves_relative_paths() {
        let db = sample_database();
        let inner = db.find_group("inner", "/Alpha").unwrap();
        assert_eq!(inner.path(), "/Alpha/Inner");
        let back_up = db.find_group("../Beta", "/Alpha").unwrap();
        assert_eq!(back_up.path(), "/Beta");
        let clamped = db.find_group("../../../Alpha", "/Alpha").unwrap();
        assert_eq!(clamped.path(), "/Alpha");
    }

    #[test]
    fn find_group_misses_unknown_names() {
        let db = sample_database();
        assert!(db.find_group("/Gamma", "/").is_none());
        assert!(db.find_group("/Alpha/Missing", "/").is_none());
    }

    #[test]
    fn membership_is_case_insensitive() {
        let db = sample_database();
        let root = db.root();
        assert!(root.has_group("ALPHA"));
        assert!(root.has_entry("top"));
        assert!(!root.has_group("Inner"));
        let alpha = db.find_group("/Alpha", "/").unwrap();
        assert!(alpha.has_entry("sample"));
    }

    #[test]
    fn names_are_sorted_case_insensitively() {
        let db = sample_database();
        assert_eq!(db.root().group_names(), vec!["Alfred", "Alpha", "Beta"]);
    }

    #[test]
    fn fuzzy_find_matches_prefixes() {
        let db = sample_database();
        let (canonical, groups, entries) = db.fuzzy_find("Al", "/");
        assert_eq!(canonical, "Al");
        assert_eq!(groups, vec!["Alfred", "Alpha"]);
        assert!(entries.is_empty());
    }

    #[test]
    fn fuzzy_find_reroots_into_exact_group() {
        let db = sample_database();
        let (canonical, groups, entries) = db.fuzzy_find("Alpha", "/");
        assert_eq!(canonical, "Alpha/");
        assert_eq!(groups, vec!["Inner"]);
        assert_eq!(entries, vec!["Sample"]);
    }

    #[test]
    fn fuzzy_find_with_directory_part() {
        let db = sample_database();
        let (_, groups, _) = db.fuzzy_find("Alpha/In", "/");
        assert_eq!(groups, vec!["Inner"]);
    }

    #[test]
    fn fuzzy_find_unresolvable_directory_is_empty() {
        let db = sample_database();
        let (canonical, groups, entries) = db.fuzzy_find("Gamma/x", "/");
        assert_eq!(canonical, "Gamma/x");
        assert!(groups.is_empty());
        assert!(entries.is_empty());
    }

    #[test]
    fn details_masks_passwords_by_default() {
        let db = sample_database();
        let alpha = db.find_group("/Alpha", "/").unwrap();
        let masked = alpha.details(0, false);
        assert!(masked.starts_with("/Alpha\n"));
        assert!(masked.contains("  Sample\n"));
        assert!(masked.contains("    Password: ****\n"));
        assert!(!masked.contains("pw"));

        let shown = alpha.details(0, true);
        assert!(shown.contains("    Password: pw\n"));
    }

    #[test]
    fn details_indents_nested_groups() {
        let db = sample_database();
        let alpha = db.find_group("/Alpha", "/").unwrap();
        let rendered = alpha.details(0, false);
        assert!(rendered.contains("\n  Inner\n"));
    }

    #[test]
    fn duplicate_sibling_names_last_wins_in_lookup() {
        let mut first = group("Dup", Vec::new(), Vec::new());
        first.uuid = Uuid::from_u128(1);
        let mut second = group("dup", Vec::new(), Vec::new());
        second.uuid = Uuid::from_u128(2);
        let root = group("root", vec![first, second], Vec::new());
        let db = Database::assemble(Meta::default(), root);
        assert_eq!(db.root().group_count(), 2);
        assert_eq!(db.root().group("DUP").unwrap().uuid(), Uuid::from_u128(2));
    }

    #[test]
    fn groups_order_by_name_and_compare_by_uuid() {
        let mut a = group("aaa", Vec::new(), Vec::new());
        a.uuid = Uuid::from_u128(1);
        let mut b = group("BBB", Vec::new(), Vec::new());
        b.uuid = Uuid::from_u128(2);
        assert!(a < b);
        assert_ne!(a, b);
        let mut a2 = group("other name", Vec::new(), Vec::new());
        a2.uuid = Uuid::from_u128(1);
        assert_eq!(a, a2);
    }
}
