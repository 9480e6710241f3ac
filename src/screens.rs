use voxnav_api::ScreenPayload;

/// A host-app screen registered for voice matching.
///
/// Owned by the caller; the SDK only reads it to build request payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenRegistration {
    /// Unique identifier within the app.
    pub screen_id: String,
    pub screen_name: String,
    /// Free-text description the backend matches utterances against.
    pub description: String,
    /// Link the host app can open when this screen is matched.
    pub deep_link: String,
    pub keywords: Vec<String>,
}

impl From<&ScreenRegistration> for ScreenPayload {
    fn from(screen: &ScreenRegistration) -> Self {
        Self {
            screen_id: screen.screen_id.clone(),
            screen_name: screen.screen_name.clone(),
            description: screen.description.clone(),
            deep_link: screen.deep_link.clone(),
            keywords: screen.keywords.clone(),
        }
    }
}
