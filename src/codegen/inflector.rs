//! Table name inflection
//!
//! `blog_posts` → `BlogPosts` (table class), `$blogPost` (entity),
//! `$blogPostsTable` (table variable). English only, covering the regular
//! plurals and the common irregular ones.

/// Irregular plural → singular, lowercase
const IRREGULAR: &[(&str, &str)] = &[
    ("people", "person"),
    ("men", "man"),
    ("women", "woman"),
    ("children", "child"),
    ("mice", "mouse"),
    ("geese", "goose"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("data", "datum"),
    ("media", "medium"),
    ("criteria", "criterion"),
];

/// Words that are the same in singular and plural
const UNCOUNTABLE: &[&str] = &[
    "news", "series", "species", "status", "equipment", "information", "sheep", "fish",
];

/// Table class name: last dotted segment, split on `_`, `-` and spaces,
/// each word capitalized.
pub fn camelize(table: &str) -> String {
    let name = table.rsplit('.').next().unwrap_or(table);
    name.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lower_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Singular form of the last word of `word`, keeping its case
pub fn singularize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();

    for &(plural, singular) in IRREGULAR {
        if lower.ends_with(plural) && word.len() >= plural.len() {
            let stem = &word[..word.len() - plural.len()];
            // Keep a capital on the replaced word, as in `BlogPeople`
            let tail = &word[word.len() - plural.len()..];
            let singular = if tail.starts_with(|c: char| c.is_ascii_uppercase()) {
                capitalize(singular)
            } else {
                singular.to_string()
            };
            return format!("{}{}", stem, singular);
        }
    }
    if UNCOUNTABLE.iter().any(|u| lower.ends_with(u)) {
        return word.to_string();
    }

    let strip = |n: usize, add: &str| format!("{}{}", &word[..word.len() - n], add);
    if lower.ends_with("ies") && word.len() > 3 {
        strip(3, "y")
    } else if lower.ends_with("sses")
        || lower.ends_with("shes")
        || lower.ends_with("ches")
        || lower.ends_with("xes")
        || lower.ends_with("zzes")
    {
        strip(2, "")
    } else if lower.ends_with("uses") {
        strip(2, "")
    } else if lower.ends_with("ss") || lower.ends_with("us") || lower.ends_with("is") {
        word.to_string()
    } else if lower.ends_with('s') && word.len() > 1 {
        strip(1, "")
    } else {
        word.to_string()
    }
}

/// `$blogPost` for `blog_posts`
pub fn entity_variable(table: &str) -> String {
    format!("${}", lower_first(&singularize(&camelize(table))))
}

/// `$blogPosts` for `blog_posts`
pub fn collection_variable(table: &str) -> String {
    let singular = entity_variable(table);
    let plural = format!("${}", lower_first(&camelize(table)));
    if plural == singular {
        format!("{}List", plural)
    } else {
        plural
    }
}

/// `$blogPostsTable` for `blog_posts`
pub fn table_variable(table: &str) -> String {
    format!("${}Table", lower_first(&camelize(table)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camelize() {
        assert_eq!(camelize("users"), "Users");
        assert_eq!(camelize("blog_posts"), "BlogPosts");
        assert_eq!(camelize("app.order_items"), "OrderItems");
        assert_eq!(camelize("BlogPosts"), "BlogPosts");
        assert_eq!(camelize("user-roles"), "UserRoles");
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("Users"), "User");
        assert_eq!(singularize("BlogPosts"), "BlogPost");
        assert_eq!(singularize("Categories"), "Category");
        assert_eq!(singularize("Addresses"), "Address");
        assert_eq!(singularize("Boxes"), "Box");
        assert_eq!(singularize("Branches"), "Branch");
        assert_eq!(singularize("Statuses"), "Status");
        assert_eq!(singularize("People"), "Person");
        assert_eq!(singularize("SalesPeople"), "SalesPerson");
        assert_eq!(singularize("News"), "News");
        assert_eq!(singularize("Status"), "Status");
        assert_eq!(singularize("Access"), "Access");
    }

    #[test]
    fn test_variables() {
        assert_eq!(entity_variable("blog_posts"), "$blogPost");
        assert_eq!(collection_variable("blog_posts"), "$blogPosts");
        assert_eq!(table_variable("blog_posts"), "$blogPostsTable");
        assert_eq!(entity_variable("users"), "$user");
        assert_eq!(collection_variable("news"), "$newsList");
    }
}
