/// The element that carries a social embed:
/// `<div data-embed="instagram" data-url="https://..."></div>`
pub struct EmbedTag;

impl EmbedTag {
    pub const ELEMENT: &'static str = "div";
    pub const PLATFORM_ATTR: &'static str = "data-embed";
    pub const URL_ATTR: &'static str = "data-url";
}
