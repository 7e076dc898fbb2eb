//! Request routing by the intent of the latest user message.

use once_cell::sync::Lazy;
use regex::Regex;

static EXPLICIT_IMAGE_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(generate|create|make|draw|paint|illustrate|render|design|produce|show)\b[^\n]*\b(image|picture|photo|photograph|illustration|art|logo|icon|wallpaper)\b",
    )
    .expect("valid image verb pattern")
});

static IMAGE_DESCRIPTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(watercolor|illustration|pastel|photorealistic|cinematic|bokeh|portrait|vector|logo|icon|wallpaper|sticker|pixel art|line art|sketch|ink|charcoal|oil|acrylic|concept art|digital painting|3d|isometric|octane|unreal|anime|pixar|8k|hdr)\b",
    )
    .expect("valid descriptor pattern")
});

static ANALYSIS_INTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(describe|explain|analy[sz]e|caption|tell me about)\b[^\n]*\b(image|picture|photo|it|this)\b",
    )
    .expect("valid analysis pattern")
});

static EDIT_INTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(edit|add|replace|remove|overlay|combine|composite|blend|merge|variation|variations|logo|stamp|put|insert|inpaint|mask|fill|make it|make this|turn this into)\b",
    )
    .expect("valid edit pattern")
});

/// Upstream path chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    MaskEdit,
    Vision,
    ImageGeneration,
    Chat,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::MaskEdit => "mask_edit",
            Route::Vision => "vision",
            Route::ImageGeneration => "image_generation",
            Route::Chat => "chat",
        }
    }

    /// Generic message shown to the user when this path fails mid-stream.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Route::MaskEdit | Route::ImageGeneration => "Image generation failed. Please try again.",
            Route::Vision | Route::Chat => "A server error occurred. Please try again.",
        }
    }
}

/// Non-textual facts about a request that influence routing.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentSignals {
    pub has_images: bool,
    pub has_pdfs: bool,
    pub has_mask: bool,
    pub force_image: bool,
}

impl IntentSignals {
    pub fn has_attachments(&self) -> bool {
        self.has_images || self.has_pdfs
    }
}

/// Pick the upstream path for `text`. First matching rule wins.
pub fn classify_intent(text: &str, signals: IntentSignals) -> Route {
    if signals.has_mask {
        return Route::MaskEdit;
    }

    let explicit = EXPLICIT_IMAGE_VERB.is_match(text);
    let descriptor = IMAGE_DESCRIPTOR.is_match(text);
    let analysis = ANALYSIS_INTENT.is_match(text);
    let edit = EDIT_INTENT.is_match(text);

    if !signals.force_image && signals.has_attachments() && (!explicit || analysis) && !edit {
        return Route::Vision;
    }

    let wants_image = signals.force_image
        || ((explicit || descriptor || edit) && !analysis)
        || signals.has_images;

    if wants_image {
        Route::ImageGeneration
    } else {
        Route::Chat
    }
}
