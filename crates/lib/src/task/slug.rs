//! Task naming convention.
//!
//! A task is declared under a CamelCase name ending in [`TASK_SUFFIX`]. The
//! suffix is stripped and the remainder converted to snake_case to produce
//! the slug used as the task's configuration key.

use crate::consts::TASK_SUFFIX;

/// Convert a CamelCase identifier to its snake_case slug.
///
/// Every uppercase character is replaced by `_` followed by its lowercase
/// form, except at the start of the identifier. Leading underscores are
/// dropped, so a slug never starts with a separator.
///
/// ```
/// use renconstruct_lib::task::slugify;
///
/// assert_eq!(slugify("YetAnother"), "yet_another");
/// assert_eq!(slugify("Example"), "example");
/// ```
pub fn slugify(name: &str) -> String {
  let mut slug = String::with_capacity(name.len() + 4);
  for (i, ch) in name.chars().enumerate() {
    if ch.is_uppercase() {
      if i > 0 {
        slug.push('_');
      }
      slug.extend(ch.to_lowercase());
    } else {
      slug.push(ch);
    }
  }
  match slug.find(|c| c != '_') {
    Some(0) => slug,
    Some(start) => slug.split_off(start),
    None => String::new(),
  }
}

/// Strip the task suffix from a declared name.
///
/// Returns `None` when the name does not end with the suffix.
pub fn strip_task_suffix(declared: &str) -> Option<&str> {
  declared.strip_suffix(TASK_SUFFIX)
}

/// Derive the slug of a declared task name.
///
/// Returns `None` for names that are not tasks.
pub fn task_slug(declared: &str) -> Option<String> {
  strip_task_suffix(declared).map(slugify)
}
