use rust_decimal::Decimal;
use serde::Serialize;

use agromaq_core::cpq::catalog::group_by_category;
use agromaq_core::domain::machine::Machine;

/// Chat clients reject longer messages.
pub const MAX_MESSAGE_CHARS: usize = 4000;
/// Machines shown per category in the catalog listing.
pub const LISTING_MACHINES_PER_CATEGORY: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    Markdown,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
}

impl MessageTemplate {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), parse_mode: None }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self { text: text.into(), parse_mode: Some(ParseMode::Markdown) }
    }
}

/// A rendered file sent alongside a caption.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Messages(Vec<MessageTemplate>),
    Document { attachment: Attachment, caption: MessageTemplate },
}

impl Reply {
    pub fn message(message: MessageTemplate) -> Self {
        Self::Messages(vec![message])
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Messages(messages) if messages.is_empty())
    }
}

/// Line-oriented builder; markdown unless `plain` is requested.
pub struct MessageBuilder {
    parse_mode: Option<ParseMode>,
    text: String,
}

impl MessageBuilder {
    pub fn markdown() -> Self {
        Self { parse_mode: Some(ParseMode::Markdown), text: String::new() }
    }

    pub fn plain() -> Self {
        Self { parse_mode: None, text: String::new() }
    }

    pub fn line(mut self, line: impl AsRef<str>) -> Self {
        self.text.push_str(line.as_ref());
        self.text.push('\n');
        self
    }

    pub fn blank(self) -> Self {
        self.line("")
    }

    pub fn lines<I, L>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        for line in lines {
            self = self.line(line);
        }
        self
    }

    /// Appends without a trailing newline.
    pub fn tail(mut self, text: impl AsRef<str>) -> Self {
        self.text.push_str(text.as_ref());
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { text: self.text, parse_mode: self.parse_mode }
    }
}

pub fn welcome_message(is_admin: bool) -> MessageTemplate {
    let builder = MessageBuilder::markdown()
        .line("🚜 *¡Bienvenido al Bot de Cotizaciones Agromaq!*")
        .blank()
        .line("Comandos disponibles:")
        .line("📋 `/listar_maquinas` - Ver catálogo completo de máquinas")
        .line("💰 `/cotizar <código> <cuit> <nombre> <teléfono> [--descuento]` - Generar cotización")
        .line("ℹ️ `/ayuda` - Ayuda detallada");

    if is_admin {
        builder
            .blank()
            .line("*Comandos de administrador:*")
            .tail("💲 `/set_price <código> <precio>` - Actualizar precio")
            .build()
    } else {
        builder.build()
    }
}

pub fn help_message(is_admin: bool, discount_percent: Decimal) -> MessageTemplate {
    let builder = MessageBuilder::markdown()
        .line("🚜 *Bot de Cotizaciones Agromaq - Ayuda Detallada*")
        .blank()
        .line("*Comandos principales:*")
        .blank()
        .line("📋 `/listar_maquinas`")
        .line("Ver todas las categorías y productos disponibles con códigos y precios actuales.")
        .blank()
        .line("💰 `/cotizar <código> <cuit> <nombre> <teléfono> [--descuento]`")
        .line("Generar cotización en PDF. Parámetros:")
        .line("• `código`: Código del producto (ej: ACO001)")
        .line("• `cuit`: CUIT del cliente (ej: 20-12345678-9)")
        .line("• `nombre`: Nombre completo del cliente")
        .line("• `teléfono`: Número de contacto")
        .line(format!("• `--descuento`: (opcional) Aplicar descuento del {}%", discount_percent.normalize()))
        .blank()
        .line("*Ejemplo:*")
        .line("`/cotizar ACO001 20-12345678-9 \"Juan Pérez\" +541112345678 --descuento`")
        .blank()
        .line("ℹ️ `/ayuda` - Mostrar esta ayuda");

    if is_admin {
        builder
            .blank()
            .line("*Comandos de administrador:*")
            .blank()
            .line("💲 `/set_price <código> <nuevo_precio>`")
            .line("Actualizar el precio de una máquina.")
            .tail("*Ejemplo:* `/set_price ACO001 25000`")
            .build()
    } else {
        builder.build()
    }
}

/// Catalog listing grouped by category, split into chunks the chat client
/// accepts.
pub fn machine_catalog_messages(machines: &[Machine]) -> Vec<MessageTemplate> {
    if machines.is_empty() {
        return vec![MessageTemplate::plain("No hay máquinas disponibles.")];
    }

    let mut builder = MessageBuilder::markdown().line("🚜 *Catálogo de Máquinas Agromaq*").blank();
    for (category, members) in group_by_category(machines) {
        builder = builder.line(format!("*📂 {category}*"));
        for machine in members.iter().take(LISTING_MACHINES_PER_CATEGORY) {
            builder = builder
                .line(format!("• `{}` - {}", machine.code, machine.name))
                .line(format!("  💰 {}", format_money(machine.price)));
        }
        if members.len() > LISTING_MACHINES_PER_CATEGORY {
            builder = builder.line(format!(
                "  ... y {} productos más",
                members.len() - LISTING_MACHINES_PER_CATEGORY
            ));
        }
        builder = builder.blank();
    }
    let listing = builder
        .tail("💡 *Tip:* Usa `/cotizar <código> <cuit> <nombre> <teléfono>` para generar una cotización")
        .build();

    split_message(&listing.text, MAX_MESSAGE_CHARS)
        .into_iter()
        .map(MessageTemplate::markdown)
        .collect()
}

pub fn quote_usage_message(discount_percent: Decimal) -> MessageTemplate {
    MessageBuilder::markdown()
        .line("❌ *Uso incorrecto*")
        .blank()
        .line("*Formato:*")
        .line("`/cotizar <código> <cuit> <nombre> <teléfono> [--descuento]`")
        .blank()
        .line("*Ejemplo:*")
        .line("`/cotizar ACO001 20-12345678-9 \"Juan Pérez\" +541112345678`")
        .blank()
        .tail(format!(
            "💡 Agrega `--descuento` al final para aplicar descuento del {}%",
            discount_percent.normalize()
        ))
        .build()
}

pub fn missing_phone_message() -> MessageTemplate {
    MessageTemplate::plain("❌ Falta el número de teléfono")
}

pub fn set_price_usage_message() -> MessageTemplate {
    MessageBuilder::markdown()
        .line("❌ *Uso incorrecto*")
        .blank()
        .line("*Formato:*")
        .line("`/set_price <código> <nuevo_precio>`")
        .blank()
        .line("*Ejemplo:*")
        .tail("`/set_price ACO001 26000`")
        .build()
}

pub fn invalid_price_message() -> MessageTemplate {
    MessageTemplate::plain("❌ El precio debe ser un número válido.")
}

pub fn forbidden_message() -> MessageTemplate {
    MessageTemplate::plain("❌ No tienes permisos para ejecutar este comando.")
}

pub fn machine_not_found_message(code: &str) -> MessageTemplate {
    MessageTemplate::plain(format!("❌ Máquina con código '{code}' no encontrada."))
}

pub fn quotation_failed_message() -> MessageTemplate {
    MessageTemplate::plain("❌ Error al generar la cotización. Intenta nuevamente.")
}

pub fn catalog_unavailable_message() -> MessageTemplate {
    MessageTemplate::plain("❌ Error al obtener el catálogo de máquinas. Intenta nuevamente.")
}

pub fn price_update_failed_message() -> MessageTemplate {
    MessageTemplate::plain("❌ Error al actualizar el precio.")
}

pub fn unknown_command_message(verb: &str) -> MessageTemplate {
    MessageTemplate::plain(format!("Comando desconocido `/{verb}`. Usa /ayuda para ver los comandos."))
}

pub fn price_updated_message(
    machine: &Machine,
    previous_price: Decimal,
) -> MessageTemplate {
    MessageBuilder::markdown()
        .line("✅ *Precio actualizado*")
        .blank()
        .line(format!("🚜 Producto: {}", machine.name))
        .line(format!("🏷️ Código: {}", machine.code))
        .line(format!("📊 Precio anterior: {}", format_money(previous_price)))
        .tail(format!("💰 Precio nuevo: {}", format_money(machine.price)))
        .build()
}

pub fn quotation_caption(
    machine: &Machine,
    client_name: &str,
    client_cuit: &str,
    final_price: Decimal,
    discount_percent: Option<Decimal>,
) -> MessageTemplate {
    let builder = MessageBuilder::markdown()
        .line("✅ *Cotización generada*")
        .blank()
        .line(format!("👤 Cliente: {client_name}"))
        .line(format!("🆔 CUIT: {client_cuit}"))
        .line(format!("🚜 Producto: {}", machine.name))
        .line(format!("🏷️ Código: {}", machine.code));

    match discount_percent {
        Some(percent) => builder
            .line(format!("💰 Precio: {}", format_money(final_price)))
            .tail(format!("🎯 Descuento aplicado: {}%", percent.normalize()))
            .build(),
        None => builder.tail(format!("💰 Precio: {}", format_money(final_price))).build(),
    }
}

/// `$25,000.00`: comma thousands, two decimals.
pub fn format_money(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let fixed = format!("{:.2}", rounded.abs());
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    format!("{sign}${}.{fraction}", group_thousands(integer, ','))
}

fn group_thousands(digits: &str, separator: char) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(digit);
    }
    grouped
}

/// Splits on character boundaries into pieces of at most `limit` characters.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if text.chars().count() <= limit {
        return vec![text.to_owned()];
    }

    let chars = text.chars().collect::<Vec<_>>();
    chars.chunks(limit.max(1)).map(|chunk| chunk.iter().collect()).collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use agromaq_core::domain::machine::{Machine, MachineCode};
    use agromaq_core::CatalogDefinition;

    use super::{
        format_money, help_message, machine_catalog_messages, quotation_caption, split_message,
        welcome_message, ParseMode, MAX_MESSAGE_CHARS,
    };

    #[test]
    fn money_uses_comma_thousands_and_two_decimals() {
        assert_eq!(format_money(Decimal::from(25_000)), "$25,000.00");
        assert_eq!(format_money(Decimal::new(22_500_5, 1)), "$22,500.50");
        assert_eq!(format_money(Decimal::from(999)), "$999.00");
        assert_eq!(format_money(Decimal::from(1_234_567)), "$1,234,567.00");
        assert_eq!(format_money(Decimal::ZERO), "$0.00");
    }

    #[test]
    fn admin_section_only_for_admins() {
        assert!(welcome_message(true).text.contains("/set_price"));
        assert!(!welcome_message(false).text.contains("/set_price"));
        assert!(help_message(true, Decimal::from(10)).text.contains("Comandos de administrador"));
        assert!(help_message(false, Decimal::from(10)).text.contains("descuento del 10%"));
    }

    #[test]
    fn listing_caps_each_category_at_five_machines() {
        let machines = CatalogDefinition::agromaq().seed_machines();
        let messages = machine_catalog_messages(&machines);

        assert_eq!(messages.len(), 1);
        let text = &messages[0].text;
        assert_eq!(messages[0].parse_mode, Some(ParseMode::Markdown));
        assert!(text.starts_with("🚜 *Catálogo de Máquinas Agromaq*"));
        assert!(text.contains("*📂 Acoplados rurales*"));
        assert!(text.contains("• `ACO005` - Acoplado totalmente desmontable"));
        assert!(!text.contains("`ACO006`"));
        assert!(text.contains("  ... y 2 productos más"));
        assert!(text.contains("  ... y 3 productos más"), "Tolvas has eight machines");
        assert!(text.contains("  💰 $11,000.00"));
        assert!(text.ends_with("para generar una cotización"));
    }

    #[test]
    fn empty_listing_has_a_plain_notice() {
        let messages = machine_catalog_messages(&[]);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "No hay máquinas disponibles.");
    }

    #[test]
    fn long_listings_are_chunked() {
        let machines = (1..=400)
            .map(|n| Machine {
                code: MachineCode(format!("CAT{n:03}")),
                name: "Acoplado de prueba con un nombre bastante largo".to_owned(),
                price: Decimal::from(10_000 + n),
                category: format!("Categoría {n}"),
                description: String::new(),
                active: true,
            })
            .collect::<Vec<_>>();

        let messages = machine_catalog_messages(&machines);
        assert!(messages.len() > 1);
        assert!(messages.iter().all(|message| message.text.chars().count() <= MAX_MESSAGE_CHARS));
        let rejoined = messages.iter().map(|message| message.text.as_str()).collect::<String>();
        assert!(rejoined.contains("CAT400"));
    }

    #[test]
    fn split_respects_multibyte_boundaries() {
        let text = "ñ".repeat(9);
        let parts = split_message(&text, 4);
        assert_eq!(parts, vec!["ññññ", "ññññ", "ñ"]);
    }

    #[test]
    fn caption_mentions_discount_only_when_applied() {
        let machine = CatalogDefinition::agromaq().seed_machines().remove(0);

        let with_discount = quotation_caption(
            &machine,
            "Juan Pérez",
            "20-12345678-9",
            Decimal::from(9_900),
            Some(Decimal::from(10)),
        );
        assert!(with_discount.text.contains("💰 Precio: $9,900.00"));
        assert!(with_discount.text.ends_with("🎯 Descuento aplicado: 10%"));

        let without =
            quotation_caption(&machine, "Juan Pérez", "20-12345678-9", Decimal::from(11_000), None);
        assert!(!without.text.contains("Descuento"));
        assert!(without.text.contains("🏷️ Código: ACO001"));
    }
}
