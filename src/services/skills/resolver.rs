//! Project Resolution
//!
//! Models refer to projects loosely: by id, full name, slug or display-id
//! prefix. When no reference is given the project is inferred from keyword
//! hints such as "APP-12" or the project name appearing in free text.

use regex::Regex;
use tracker_assistant_core::Project;

/// Resolves project references against a project list
pub struct ProjectResolver<'a> {
    projects: &'a [Project],
}

impl<'a> ProjectResolver<'a> {
    pub fn new(projects: &'a [Project]) -> Self {
        Self { projects }
    }

    /// Resolve an explicit reference, or infer from `hints` when absent.
    pub fn resolve(&self, reference: Option<&str>, hints: &[&str]) -> Result<&'a Project, String> {
        match reference.map(str::trim).filter(|r| !r.is_empty()) {
            Some(reference) => self
                .find(reference)
                .ok_or_else(|| format!("unknown project '{}'; {}", reference, self.available())),
            None => self.infer(hints).ok_or_else(|| {
                format!("a project is required; {}", self.available())
            }),
        }
    }

    /// Match by id, then name, slug or prefix (case-insensitive).
    pub fn find(&self, reference: &str) -> Option<&'a Project> {
        let reference = reference.trim();
        self.projects
            .iter()
            .find(|p| p.id == reference)
            .or_else(|| {
                self.projects.iter().find(|p| {
                    p.name.eq_ignore_ascii_case(reference)
                        || p.slug.eq_ignore_ascii_case(reference)
                        || p.prefix.eq_ignore_ascii_case(reference)
                })
            })
    }

    /// The only project, or the single project whose prefix or name appears
    /// in the hints.
    pub fn infer(&self, hints: &[&str]) -> Option<&'a Project> {
        if self.projects.len() == 1 {
            return self.projects.first();
        }
        let text = hints.join("\n");
        if text.trim().is_empty() {
            return None;
        }
        let lowered = text.to_lowercase();

        let mut matches = self.projects.iter().filter(|p| {
            let prefix_hit = mentions_display_id(&text, &p.prefix);
            let name_hit = p.name.chars().count() >= 3 && lowered.contains(&p.name.to_lowercase());
            prefix_hit || name_hit
        });
        let first = matches.next()?;
        match matches.next() {
            None => Some(first),
            Some(_) => None,
        }
    }

    fn available(&self) -> String {
        if self.projects.is_empty() {
            return "no projects are available".to_string();
        }
        let names: Vec<String> = self
            .projects
            .iter()
            .map(|p| format!("{} ({})", p.name, p.prefix))
            .collect();
        format!("available: {}", names.join(", "))
    }
}

/// Whether `text` contains a display id such as `APP-12` for this prefix.
fn mentions_display_id(text: &str, prefix: &str) -> bool {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return false;
    }
    Regex::new(&format!(r"(?i)\b{}-\d+\b", regex::escape(prefix)))
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}
