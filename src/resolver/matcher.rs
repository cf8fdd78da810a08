//! Folder name matching

use rapidfuzz::distance::levenshtein;

/// Lower-cases `name` and strips literal `.` characters
///
/// Spaces are kept, so "Mr Robot" and "Mr.Robot" normalize differently
/// ("mr robot" vs "mrrobot").
pub fn normalize_folder_name(name: &str) -> String {
    name.to_lowercase().replace('.', "")
}

/// Returns true if the normalized `query` is a substring of the normalized `folder`
pub fn folder_matches(folder: &str, query: &str) -> bool {
    normalize_folder_name(folder).contains(&normalize_folder_name(query))
}

/// Returns the folders matching `query`, in listing order
///
/// Duplicates in the input are kept. An empty result means nothing matched.
pub fn match_folders<S: AsRef<str>>(folders: &[S], query: &str) -> Vec<String> {
    let query = normalize_folder_name(query);
    folders
        .iter()
        .map(AsRef::as_ref)
        .filter(|folder| normalize_folder_name(folder).contains(&query))
        .map(str::to_string)
        .collect()
}

/// First folder whose name starts with `show_name`, byte for byte
///
/// Unlike [`match_folders`] this neither lower-cases nor strips dots.
pub(crate) fn first_prefixed<'a>(folders: &'a [String], show_name: &str) -> Option<&'a str> {
    folders
        .iter()
        .map(String::as_str)
        .find(|folder| folder.starts_with(show_name))
}

/// Best similarity (0-100) of the shorter string against any equally long
/// window of the longer one
///
/// Comparison is by `char`, and an empty input scores 0.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    if short.is_empty() {
        return 0.0;
    }

    long.windows(short.len())
        .map(|window| {
            levenshtein::normalized_similarity(short.iter().copied(), window.iter().copied())
        })
        .fold(0.0_f64, f64::max)
        * 100.0
}
