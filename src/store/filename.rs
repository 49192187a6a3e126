//! Filename derivation for dumped attachments.

use percent_encoding::percent_decode_str;
use url::Url;

/// Derives a flat filename from an attachment URL.
///
/// The URL is percent-decoded, then `:` and `/` are replaced with `_` so
/// the full source address stays recoverable from the name.
///
/// # Example
///
/// ```
/// use url::Url;
/// use bbexport::store::filename::image_file_name;
///
/// let url = Url::parse("https://bitbucket.org/ws/repo/images/a%20b.png")
///     .expect("URL should parse");
/// assert_eq!(
///     image_file_name(&url),
///     "https___bitbucket.org_ws_repo_images_a b.png"
/// );
/// ```
#[must_use]
pub fn image_file_name(url: &Url) -> String {
    let decoded = percent_decode_str(url.as_str())
        .decode_utf8()
        .map_or_else(|_| url.as_str().to_owned(), |decoded| decoded.into_owned());
    decoded.replace([':', '/'], "_")
}
