// Archivo: session.rs
// Propósito: usuario de la sesión que aporta `created_by` en las altas.
use cryo_domain::ValidationError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user_id: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: impl Into<String>) -> Self {
        let id = user_id.into();
        Self { user_id: Some(id).filter(|s| !s.trim().is_empty()) }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Usuario obligatorio para altas con autor.
    pub(crate) fn require_user(&self) -> Result<&str, ValidationError> {
        self.user_id().ok_or_else(|| ValidationError::single("created_by", "se requiere un usuario de sesión"))
    }
}
