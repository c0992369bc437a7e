use serde::{Deserialize, Serialize};

/// Client data captured with a quotation request.
///
/// Both request surfaces (HTTP and chat bot) build this same value; it is
/// never mutated after the request has been parsed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    #[serde(rename = "client_cuit")]
    pub cuit: String,
    #[serde(rename = "client_name")]
    pub name: String,
    #[serde(rename = "client_phone")]
    pub phone: String,
    #[serde(rename = "client_address")]
    pub address: Option<String>,
    #[serde(rename = "client_email")]
    pub email: Option<String>,
    #[serde(rename = "client_company")]
    pub company: Option<String>,
    pub notes: Option<String>,
}

impl ClientInfo {
    pub fn new(cuit: impl Into<String>, name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self { cuit: cuit.into(), name: name.into(), phone: phone.into(), ..Self::default() }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = non_blank(address.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = non_blank(email.into());
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = non_blank(company.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = non_blank(notes.into());
        self
    }

    /// Name as used in download filenames: spaces become dashes.
    pub fn file_slug(&self) -> String {
        self.name.trim().replace(' ', "-")
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
