//! Parse configuration.

/// Options for [`parse_document`](crate::parse_document).
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Fetch and base64-encode every image referenced by the content.
    pub collect_images: bool,
    /// Add the package's cover image to the collected images.
    pub include_cover_image: bool,
    /// `@media` types whose rules apply.
    pub media_types: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            collect_images: true,
            include_cover_image: true,
            media_types: vec!["all".to_string(), "screen".to_string()],
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collect_images(mut self, collect: bool) -> Self {
        self.collect_images = collect;
        self
    }

    pub fn with_cover_image(mut self, include: bool) -> Self {
        self.include_cover_image = include;
        self
    }

    pub fn with_media_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.media_types = types.into_iter().map(Into::into).collect();
        self
    }
}

/// Options for [`extract_metadata`](crate::extract_metadata).
#[derive(Debug, Clone, Default)]
pub struct MetadataOptions {
    /// Also fetch the cover image and return it base64-encoded.
    pub extract_cover: bool,
}

impl MetadataOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cover(mut self, extract: bool) -> Self {
        self.extract_cover = extract;
        self
    }
}
