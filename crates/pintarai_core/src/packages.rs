//! crates/pintarai_core/src/packages.rs
//!
//! The static token package table. Looked up by the package id embedded in
//! an order id; never read from the database.

/// One purchasable token package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPackage {
    pub id: &'static str,
    pub tokens: i64,
    /// Price in the smallest currency unit (rupiah).
    pub price: i64,
    pub description: &'static str,
}

pub const TOKEN_PACKAGES: &[TokenPackage] = &[
    TokenPackage {
        id: "starter",
        tokens: 50,
        price: 15_000,
        description: "Paket Starter - 50 token untuk mencoba",
    },
    TokenPackage {
        id: "student",
        tokens: 250,
        price: 50_000,
        description: "Paket Pelajar - 250 token untuk belajar rutin",
    },
    TokenPackage {
        id: "scholar",
        tokens: 600,
        price: 100_000,
        description: "Paket Juara - 600 token untuk persiapan ujian",
    },
];

pub fn find_package(id: &str) -> Option<&'static TokenPackage> {
    TOKEN_PACKAGES.iter().find(|p| p.id == id)
}
