/*
[INPUT]:  Task titles and task ids
[OUTPUT]: Shareable task slugs and extracted short ids
[POS]:    Utility layer - slug generation and parsing
[UPDATE]: When the slug format changes
*/

/// Length of the task-id suffix carried in a slug.
const SHORT_ID_LEN: usize = 8;

/// Build a shareable slug from a task title and id, e.g.
/// `"Plan Weekend!!"` + `"abcdef1234567890"` -> `"plan-weekend-abcdef12"`.
///
/// The title is lowercased with every non-alphanumeric run collapsed to
/// a single hyphen; the suffix is the first eight characters of the id.
pub fn generate_task_slug(title: &str, task_id: &str) -> String {
    let mut slug = String::with_capacity(title.len() + SHORT_ID_LEN + 1);
    let mut pending_hyphen = false;

    for ch in title.chars() {
        if ch.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    let short_id: String = task_id.chars().take(SHORT_ID_LEN).collect();
    if slug.is_empty() {
        return short_id;
    }
    slug.push('-');
    slug.push_str(&short_id);
    slug
}

/// Pull the short task id back out of a slug (the final hyphen-separated
/// segment). Returns `None` for an empty slug.
pub fn task_id_from_slug(slug: &str) -> Option<&str> {
    slug.rsplit('-').next().filter(|segment| !segment.is_empty())
}
