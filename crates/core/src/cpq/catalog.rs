use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::machine::{Machine, MachineCode};

const CODE_PREFIX_LEN: usize = 3;
const SEED_BASE_PRICE: i64 = 10_000;
const SEED_PRICE_STEP: i64 = 1_000;

/// One category of the static reference catalog, serialized the way the
/// web client expects it (`categoria` / `productos`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCategory {
    #[serde(rename = "categoria")]
    pub name: String,
    #[serde(rename = "productos")]
    pub products: Vec<String>,
}

/// Read-only category → product listing used to seed the machine store and
/// served verbatim by the catalog endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CatalogDefinition {
    categories: Vec<CatalogCategory>,
}

impl CatalogDefinition {
    pub fn new(categories: Vec<CatalogCategory>) -> Self {
        Self { categories }
    }

    /// The dealer's product line.
    pub fn agromaq() -> Self {
        Self::new(vec![
            category(
                "Acoplados rurales",
                &[
                    "Acoplado rural playo",
                    "Acoplado rural vaquero desmontable",
                    "Acoplado rural vaquero desmontable 2",
                    "Acoplado rural vaquero fijo",
                    "Acoplado totalmente desmontable",
                    "Acoplado volcador manual o hidráulico",
                    "Acoplado volcador trivuelo de uso rural",
                ],
            ),
            category(
                "Acoplados tanque",
                &[
                    "Acoplado tanque 3000 Lts.",
                    "Acoplado tanque de 1500 Lts.",
                    "Acoplado tanque de plástico 12.000 Lts.",
                    "Acoplado tanque de plástico 1500 Lts.",
                    "Acoplado tanque de plástico 3500 Lts.",
                    "Acoplado tanque de plástico 7000 Lts.",
                    "Acoplado tanques rurales",
                ],
            ),
            category(
                "Tolvas",
                &[
                    "Acoplado tolva cerealero 4 TT.",
                    "Acoplado tolva cerealero 8 TT.",
                    "Acoplado Tolva para semillas y fertilizantes de uso rural",
                    "Acoplado Tolva Para Semillas Y Fertilizantes De Uso Rural",
                    "Acoplado tolva para semillas y fertilizantes modelo A.T.F. 10",
                    "Acoplado tolva para semillas y fertilizantes modelo A.T.F. 14",
                    "Acoplado tolva para semillas y fertilizantes Modelo A.T.F. 24",
                    "Acoplados tolvas para semillas y fertilizantes Modelo A.T.F. 12",
                ],
            ),
            category(
                "Cargadores y elevadores",
                &[
                    "Cargador y transportador de rollos hidráulico T.R.A. 6000",
                    "Elevador de rollos",
                    "Grúa giratoria hidráulica multipropósito de uso rural",
                ],
            ),
        ])
    }

    pub fn categories(&self) -> &[CatalogCategory] {
        &self.categories
    }

    pub fn product_count(&self) -> usize {
        self.categories.iter().map(|category| category.products.len()).sum()
    }

    pub fn find_category(&self, name: &str) -> Option<&CatalogCategory> {
        self.categories.iter().find(|category| category.name == name)
    }

    /// Expands the definition into machine rows, in listing order.
    ///
    /// The counter runs across categories, so two categories sharing a
    /// three-letter prefix still get distinct codes.
    pub fn seed_machines(&self) -> Vec<Machine> {
        let mut counter = 0u32;
        let mut machines = Vec::with_capacity(self.product_count());

        for category in &self.categories {
            for product in &category.products {
                counter += 1;
                machines.push(Machine {
                    code: machine_code(&category.name, counter),
                    name: product.clone(),
                    price: seed_price(counter),
                    category: category.name.clone(),
                    description: format!("Descripción de {product}"),
                    active: true,
                });
            }
        }

        machines
    }
}

/// `ACO` + `001`: first three letters of the category, upper-cased, plus a
/// zero-padded counter.
pub fn machine_code(category: &str, counter: u32) -> MachineCode {
    let prefix = category.chars().take(CODE_PREFIX_LEN).collect::<String>().to_uppercase();
    MachineCode(format!("{prefix}{counter:03}"))
}

fn seed_price(counter: u32) -> Decimal {
    Decimal::from(SEED_BASE_PRICE + i64::from(counter) * SEED_PRICE_STEP)
}

/// Groups machines by category, keeping first-seen category order.
pub fn group_by_category(machines: &[Machine]) -> Vec<(&str, Vec<&Machine>)> {
    let mut groups: Vec<(&str, Vec<&Machine>)> = Vec::new();
    for machine in machines {
        match groups.iter_mut().find(|(name, _)| *name == machine.category) {
            Some((_, members)) => members.push(machine),
            None => groups.push((machine.category.as_str(), vec![machine])),
        }
    }
    groups
}

fn category(name: &str, products: &[&str]) -> CatalogCategory {
    CatalogCategory {
        name: name.to_owned(),
        products: products.iter().map(|product| (*product).to_owned()).collect(),
    }
}
