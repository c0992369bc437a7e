//! Quotation document rendering.
//!
//! A quotation is first laid out as a typed [`DocumentLayout`], rendered to
//! HTML through an embedded Tera template, then handed to a [`PdfConverter`]
//! (wkhtmltopdf by default). Without a working converter the renderer returns
//! the print-ready HTML instead of failing.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use agromaq_core::clock::Clock;
use agromaq_core::config::{DescriptionMode, DocumentConfig};
use agromaq_core::domain::{client::ClientInfo, machine::Machine};
use async_trait::async_trait;
use base64::Engine;
use chrono::Datelike;
use rust_decimal::Decimal;
use serde::Serialize;
use tera::{Context, Tera};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

const TEMPLATE_NAME: &str = "quotation.html";
const DOCUMENT_TITLE: &str = "COTIZACION";

const SPANISH_MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

const CONDITIONS: [&str; 3] = [
    "LOS PRECIOS COTIZADOS SON NETOS A CONCESIONARIOS",
    "NO INCLUYEN EL 10,5% DE I.V.A.",
    "Los precios cotizados son puestos en fábrica sobre camión.",
];

const FIXED_PRODUCT_HEADING: &str = "ACOPLADO VOLCADOR TRIVUELCO DE USO RURAL";
const FIXED_MODEL_LINE: &str = "MODELO A. V. A. 4000:";

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("template error: {0}")]
    Template(String),
    #[error("conversion error: {0}")]
    Conversion(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One bullet of the product section: an optional bold lead followed by text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SpecLine {
    pub emphasis: Option<String>,
    pub text: String,
}

impl SpecLine {
    fn bold(emphasis: &str) -> Self {
        Self { emphasis: Some(emphasis.to_owned()), text: String::new() }
    }

    fn plain(text: &str) -> Self {
        Self { emphasis: None, text: text.to_owned() }
    }

    fn labelled(emphasis: &str, text: &str) -> Self {
        Self { emphasis: Some(emphasis.to_owned()), text: text.to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DocumentLayout {
    pub logo: Option<String>,
    pub date_line: String,
    pub recipient: Vec<String>,
    pub title: String,
    pub product_heading: String,
    pub model_line: String,
    pub specifications: Vec<SpecLine>,
    pub price_line: String,
    pub conditions: Vec<String>,
    pub footer: Vec<String>,
}

/// Output of a render: a PDF, or the HTML it would have been built from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderedDocument {
    Pdf(Vec<u8>),
    Html(String),
}

impl RenderedDocument {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Pdf(_) => "application/pdf",
            Self::Html(_) => "text/html; charset=utf-8",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf(_) => "pdf",
            Self::Html(_) => "html",
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Pdf(bytes) => bytes,
            Self::Html(html) => html.into_bytes(),
        }
    }
}

#[async_trait]
pub trait PdfConverter: Send + Sync {
    async fn convert(&self, html: &str) -> Result<Vec<u8>, PdfError>;
}

/// Shells out to `wkhtmltopdf` through temp files.
#[derive(Clone, Debug)]
pub struct WkhtmltopdfConverter {
    binary: PathBuf,
}

impl WkhtmltopdfConverter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    /// Resolves the configured binary, or `wkhtmltopdf` on `PATH`.
    pub fn locate(configured: Option<&str>) -> Option<Self> {
        let located = match configured {
            Some(path) => which::which(path),
            None => which::which("wkhtmltopdf"),
        };

        match located {
            Ok(binary) => {
                info!(path = %binary.display(), "wkhtmltopdf found");
                Some(Self::new(binary))
            }
            Err(_) => {
                warn!(
                    event_name = "document.converter.unavailable",
                    "wkhtmltopdf not found - quotation documents will be served as HTML"
                );
                None
            }
        }
    }
}

#[async_trait]
impl PdfConverter for WkhtmltopdfConverter {
    async fn convert(&self, html: &str) -> Result<Vec<u8>, PdfError> {
        let temp_dir = std::env::temp_dir();
        let stem = uuid::Uuid::new_v4().simple().to_string();
        let html_path = temp_dir.join(format!("cotizacion_{stem}.html"));
        let pdf_path = temp_dir.join(format!("cotizacion_{stem}.pdf"));

        tokio::fs::write(&html_path, html).await?;

        let output = Command::new(&self.binary)
            .args(["--page-size", "A4"])
            .args(["--margin-top", "8mm", "--margin-bottom", "20mm"])
            .args(["--margin-left", "10mm", "--margin-right", "10mm"])
            .args(["--encoding", "utf-8"])
            .arg(&html_path)
            .arg(&pdf_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let result = match output {
            Ok(output) if output.status.success() => {
                tokio::fs::read(&pdf_path).await.map_err(PdfError::from)
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                error!(stderr = %stderr, "wkhtmltopdf failed");
                Err(PdfError::Conversion(stderr))
            }
            Err(io_error) => Err(PdfError::Io(io_error)),
        };

        let _ = tokio::fs::remove_file(&html_path).await;
        let _ = tokio::fs::remove_file(&pdf_path).await;

        result
    }
}

pub struct DocumentRenderer {
    tera: Tera,
    settings: DocumentConfig,
    logo: Option<String>,
    clock: Arc<dyn Clock>,
    converter: Option<Arc<dyn PdfConverter>>,
}

impl DocumentRenderer {
    /// Builds a renderer over the embedded template. The logo is read once
    /// here; a configured logo that cannot be read leaves blank space.
    pub fn new(settings: DocumentConfig, clock: Arc<dyn Clock>) -> Result<Self, PdfError> {
        Self::with_template(
            settings,
            clock,
            include_str!("../../../templates/quotation.html.tera"),
        )
    }

    /// Same as [`DocumentRenderer::new`] over a caller-supplied Tera source,
    /// rendered against a [`DocumentLayout`].
    pub fn with_template(
        settings: DocumentConfig,
        clock: Arc<dyn Clock>,
        template: &str,
    ) -> Result<Self, PdfError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, template)
            .map_err(|e| PdfError::Template(e.to_string()))?;

        let logo = settings.logo_path.as_deref().and_then(load_logo);

        Ok(Self { tera, settings, logo, clock, converter: None })
    }

    pub fn with_converter(mut self, converter: Option<Arc<dyn PdfConverter>>) -> Self {
        self.converter = converter;
        self
    }

    pub fn layout(
        &self,
        machine: &Machine,
        client: &ClientInfo,
        final_price: Decimal,
    ) -> DocumentLayout {
        let (product_heading, model_line, specifications) = match self.settings.description_mode
        {
            DescriptionMode::Machine => machine_description(machine),
            DescriptionMode::Fixed => fixed_description(),
        };

        let mut conditions = CONDITIONS.iter().map(|line| (*line).to_owned()).collect::<Vec<_>>();
        conditions.push(self.settings.validity_notice.clone());

        DocumentLayout {
            logo: self.logo.clone(),
            date_line: date_line(&self.settings.city, self.clock.today()),
            recipient: recipient_lines(client),
            title: DOCUMENT_TITLE.to_owned(),
            product_heading,
            model_line,
            specifications,
            price_line: price_line(final_price, self.settings.line_width),
            conditions,
            footer: self.settings.footer_lines.clone(),
        }
    }

    pub fn render_html(&self, layout: &DocumentLayout) -> Result<String, PdfError> {
        let context =
            Context::from_serialize(layout).map_err(|e| PdfError::Template(e.to_string()))?;
        self.tera.render(TEMPLATE_NAME, &context).map_err(|e| PdfError::Template(e.to_string()))
    }

    /// Renders the quotation document. Only a template failure is an error;
    /// conversion problems fall back to HTML.
    pub async fn render(
        &self,
        machine: &Machine,
        client: &ClientInfo,
        final_price: Decimal,
    ) -> Result<RenderedDocument, PdfError> {
        let layout = self.layout(machine, client, final_price);
        let html = self.render_html(&layout)?;

        let Some(converter) = &self.converter else {
            debug!(machine_code = %machine.code, "no pdf converter configured, serving html");
            return Ok(RenderedDocument::Html(html));
        };

        match converter.convert(&html).await {
            Ok(bytes) => {
                info!(
                    event_name = "document.rendered",
                    machine_code = %machine.code,
                    size = bytes.len(),
                    "quotation pdf generated"
                );
                Ok(RenderedDocument::Pdf(bytes))
            }
            Err(conversion_error) => {
                warn!(
                    event_name = "document.conversion_failed",
                    machine_code = %machine.code,
                    error = %conversion_error,
                    "PDF conversion failed, falling back to HTML"
                );
                Ok(RenderedDocument::Html(html))
            }
        }
    }
}

/// `"{city}; {day} de {month} del {year}"`.
pub fn date_line(city: &str, date: chrono::NaiveDate) -> String {
    let month = SPANISH_MONTHS[date.month0() as usize];
    format!("{city}; {} de {month} del {}", date.day(), date.year())
}

/// Right-aligned price: dot fill, whole pesos with `.` grouping, `.=` tail.
pub fn price_line(final_price: Decimal, line_width: usize) -> String {
    let price = if final_price.is_zero() {
        "$-".to_owned()
    } else {
        format!("${}", group_thousands(final_price))
    };
    let fill = line_width.saturating_sub(price.chars().count() + 2).max(1);
    format!("{}{price}.=", ".".repeat(fill))
}

/// Integer part of `value` with `.` between thousands; cents are dropped.
fn group_thousands(value: Decimal) -> String {
    let digits = value.trunc().abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value.is_sign_negative() {
        grouped.push('-');
    }
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }
    grouped
}

/// Name, tax id, address, phone; blank entries are left out.
pub fn recipient_lines(client: &ClientInfo) -> Vec<String> {
    [Some(&client.name), Some(&client.cuit), client.address.as_ref(), Some(&client.phone)]
        .into_iter()
        .flatten()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .collect()
}

fn machine_description(machine: &Machine) -> (String, String, Vec<SpecLine>) {
    let mut specifications = vec![SpecLine::labelled("Categoría:", &machine.category)];
    if !machine.description.trim().is_empty() {
        specifications.push(SpecLine::plain(&machine.description));
    }
    (machine.name.to_uppercase(), format!("MODELO {}:", machine.code), specifications)
}

fn fixed_description() -> (String, String, Vec<SpecLine>) {
    let specifications = vec![
        SpecLine::labelled(
            "TRIVUELCO:",
            "cambiando 1 perno de lugar elige si quiere descargar hacia la derecha, izquierda o atrás.",
        ),
        SpecLine::bold("Capacidad de carga 8000 Kg."),
        SpecLine::plain("Chasis construido con chapa plegada y estampada"),
        SpecLine::plain("Dirección de giro con avantrén a bolillas"),
        SpecLine::plain("Largo útil 4 Mts. - Ancho útil 2,10 Mts."),
        SpecLine::plain(
            "Barandas cerradas de 70 Cts., de alto - Puertas desacoplables en su parte superior o inferior, esto permite poder volcar, sacar o descargar desde abajo.",
        ),
        SpecLine::bold("Cilindro hidráulico, telescópico y oscilante de 3 tramos."),
        SpecLine::bold("2 Ejes macizos de 3\""),
        SpecLine::bold("4 Elásticos reforzados 63 x 10 x 12 hojas"),
        SpecLine::plain("Piso de chapa"),
        SpecLine::labelled(
            "8 Llantas duales p/calzar neumáticos 750 x 16.",
            "(no incluye neumáticos).",
        ),
    ];
    (FIXED_PRODUCT_HEADING.to_owned(), FIXED_MODEL_LINE.to_owned(), specifications)
}

fn load_logo(path: &Path) -> Option<String> {
    match std::fs::read(path) {
        Ok(bytes) => {
            let mime = match path.extension().and_then(|ext| ext.to_str()) {
                Some("jpg" | "jpeg") => "image/jpeg",
                Some("svg") => "image/svg+xml",
                _ => "image/png",
            };
            let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
            Some(format!("data:{mime};base64,{encoded}"))
        }
        Err(read_error) => {
            warn!(
                event_name = "document.logo_missing",
                path = %path.display(),
                error = %read_error,
                "logo not found, leaving blank space"
            );
            None
        }
    }
}
