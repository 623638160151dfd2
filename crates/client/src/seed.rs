//! Built-in catalog seed.
//!
//! The storefront renders instantly from this compiled-in catalog; remote
//! rows are merged over it once (and if) the gateway answers. Ids below 100
//! are reserved for seed rows so remote inserts never collide.

use cardvault_core::{Product, ProductId};
use rust_decimal::Decimal;

/// Category slugs and their display names, in storefront filter order.
pub const CATEGORIES: &[(&str, &str)] = &[
    ("booster", "Booster Boxes"),
    ("etb", "Elite Trainer Boxes"),
    ("bundles", "Bundles & Tins"),
    ("special", "Special Collections"),
];

fn product(
    id: i64,
    name: &str,
    price_cents: i64,
    category: &str,
    stock: u32,
    badge: Option<&str>,
    image: &str,
    description: &str,
) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        price: Decimal::new(price_cents, 2),
        category: category.to_string(),
        stock,
        badge: badge.map(str::to_string),
        image: image.to_string(),
        description: description.to_string(),
    }
}

/// The compiled-in catalog, ordered by id.
#[must_use]
pub fn products() -> Vec<Product> {
    vec![
        product(
            1,
            "Surging Sparks Booster Box",
            22000,
            "booster",
            12,
            Some("HOT"),
            "https://product-images.tcgplayer.com/565606/400w.jpg",
            "36 booster packs featuring Pikachu ex and powerful Thunder-type Pokemon. One of the most sought-after sets in the Scarlet & Violet era.",
        ),
        product(
            2,
            "Scarlet & Violet 151 Booster Bundle",
            3500,
            "bundles",
            48,
            Some("NEW"),
            "https://product-images.tcgplayer.com/502000/400w.jpg",
            "A bundle of boosters celebrating the original 151 Pokemon. Perfect for collectors chasing Mew ex or Alakazam ex.",
        ),
        product(
            3,
            "Journey Together Elite Trainer Box",
            5000,
            "etb",
            35,
            None,
            "/img/journey-together-etb.webp",
            "9 booster packs, 65 card sleeves, a player's guide, and premium accessories in the Journey Together theme.",
        ),
        product(
            4,
            "Rebel Clash Booster Box",
            35000,
            "booster",
            4,
            Some("VAULT"),
            "https://product-images.tcgplayer.com/211756/400w.jpg",
            "Classic Sword & Shield era box with powerful V and VMAX Pokemon. A highly sought vintage box from the golden era.",
        ),
        product(
            5,
            "Twilight Masquerade Booster Box",
            23000,
            "booster",
            14,
            None,
            "https://product-images.tcgplayer.com/543846/400w.jpg",
            "A mysterious festival-themed set featuring Ogerpon ex in all its forms and new Illustration Rare cards.",
        ),
        product(
            6,
            "OP-13 Booster Box",
            26000,
            "booster",
            5,
            Some("RARE"),
            "https://product-images.tcgplayer.com/628352/400w.jpg",
            "One Piece TCG OP-13 set packed with powerful new attacks for your favorite Straw Hat crew members.",
        ),
        product(
            7,
            "Prismatic PC ETB",
            16000,
            "etb",
            3,
            Some("LIMIT"),
            "/img/prismatic-pc-etb.webp",
            "The Prismatic Evolutions Premier Collection: 11 packs, an exclusive Eevee promo, and rainbow accessories.",
        ),
        product(
            8,
            "151 UPC",
            13000,
            "special",
            7,
            None,
            "/img/151-upc.webp",
            "The 151 Ultra Premium Collection with a Mew VMAX figure, metal coins, and 16 booster packs. A centerpiece.",
        ),
    ]
}
