use mongodb::Client;

use crate::db::vendors;
use crate::schemas::{AddOn, BaseOption, InstructionPolicy, PortionSize, TiffinOptions, Vendor};

/// Starter catalog for fresh deployments; also the fixture the unit tests
/// price against.
pub fn sample_vendors() -> Vec<Vendor> {
    vec![
        Vendor {
            id: "spice-garden".into(),
            name: "Spice Garden".into(),
            cuisine: "North Indian".into(),
            rating: 4.7,
            delivery_time: "30-45 mins".into(),
            description: "Authentic Punjabi flavors with homemade spices".into(),
            min_order: 2,
            delivery_fee: 20,
            tiffin_options: TiffinOptions {
                base_options: vec![
                    base("veg", "Vegetarian", 80, "Pure vegetarian meals", true),
                    base("non-veg", "Non-Vegetarian", 100, "Includes chicken options", false),
                ],
                portion_sizes: vec![
                    portion("half", "Half Portion", 0.6, "60% of full portion", false),
                    portion("full", "Full Portion", 1.0, "Standard portion size", true),
                ],
                add_ons: vec![
                    add_on("salad", "Extra Salad", 20, "Fresh vegetable salad"),
                    add_on("dessert", "Dessert", 30, "Daily sweet dish"),
                    add_on("papad", "Papad", 10, "Crispy lentil wafers"),
                ],
                special_instructions: policy(100, "Less spicy, No onion, Extra gravy"),
            },
        },
        Vendor {
            id: "curry-leaves".into(),
            name: "Curry Leaves".into(),
            cuisine: "South Indian".into(),
            rating: 4.5,
            delivery_time: "25-40 mins".into(),
            description: "Traditional Kerala meals served on banana leaves".into(),
            min_order: 3,
            delivery_fee: 15,
            tiffin_options: TiffinOptions {
                base_options: vec![
                    base("veg", "Vegetarian", 70, "Traditional vegetarian meals", true),
                    base("non-veg", "Non-Vegetarian", 90, "Includes fish or chicken", false),
                ],
                portion_sizes: vec![
                    portion("half", "Half Portion", 0.6, "60% of full portion", false),
                    portion("full", "Full Portion", 1.0, "Standard portion size", true),
                ],
                add_ons: vec![
                    add_on("chutney", "Extra Chutney", 15, "Coconut or tomato chutney"),
                    add_on("sambar", "Extra Sambar", 25, "Lentil vegetable stew"),
                    add_on("coffee", "Filter Coffee", 30, "Traditional South Indian coffee"),
                ],
                special_instructions: policy(100, "Less salt, Extra sambar, No garlic"),
            },
        },
        Vendor {
            id: "dum-biryani-house".into(),
            name: "Dum Biryani House".into(),
            cuisine: "Hyderabadi".into(),
            rating: 4.8,
            delivery_time: "40-55 mins".into(),
            description: "Authentic dum-cooked biryanis with secret recipes".into(),
            min_order: 1,
            delivery_fee: 25,
            tiffin_options: TiffinOptions {
                base_options: vec![
                    base("veg", "Vegetarian Biryani", 120, "Vegetable dum biryani", false),
                    base("non-veg", "Chicken Biryani", 150, "Hyderabadi chicken dum biryani", true),
                ],
                portion_sizes: vec![
                    portion("half", "Half Portion", 0.5, "50% of full portion", false),
                    portion("full", "Full Portion", 1.0, "Standard portion size", true),
                ],
                add_ons: vec![
                    add_on("mirchi", "Mirchi Ka Salan", 50, "Spicy chili curry"),
                    add_on("raita", "Biryani Raita", 30, "Cooling yogurt side"),
                    add_on("salad", "Onion Salad", 20, "Fresh onion rings with lemon"),
                ],
                special_instructions: policy(100, "Extra spicy, Less oil, No boiled egg"),
            },
        },
    ]
}

/// Inserts the sample catalog unless vendors already exist. Returns how many
/// documents were written.
pub async fn seed_vendors(client: &Client) -> Result<usize, mongodb::error::Error> {
    let collection = vendors(client);
    if collection.count_documents(None, None).await? > 0 {
        log::info!("Vendors already exist, skipping seed");
        return Ok(0);
    }
    let catalog = sample_vendors();
    collection.insert_many(&catalog, None).await?;
    log::info!("Seeded {} vendors", catalog.len());
    Ok(catalog.len())
}

fn base(id: &str, name: &str, base_price: u32, description: &str, is_default: bool) -> BaseOption {
    BaseOption {
        id: id.into(),
        name: name.into(),
        base_price,
        description: description.into(),
        is_default,
    }
}

fn portion(
    id: &str,
    name: &str,
    multiplier: f64,
    description: &str,
    is_default: bool,
) -> PortionSize {
    PortionSize {
        id: id.into(),
        name: name.into(),
        multiplier,
        description: description.into(),
        is_default,
    }
}

fn add_on(id: &str, name: &str, price: u32, description: &str) -> AddOn {
    AddOn {
        id: id.into(),
        name: name.into(),
        price,
        description: description.into(),
    }
}

fn policy(max_length: usize, examples: &str) -> InstructionPolicy {
    InstructionPolicy {
        max_length,
        examples: examples.into(),
    }
}
