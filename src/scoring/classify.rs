//! Keyword tables mapping free text to a venture type and a (role, services) pair.

/// Venture types checked in order; first keyword hit wins.
const VENTURE_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Restaurants",
        &["restaurant", "cafe", "coffee", "bistro", "bar", "diner", "food court"],
    ),
    ("Hospitality", &["hotel", "resort", "hostel", "homestay"]),
    (
        "Fashion",
        &[
            "fashion", "boutique", "apparel", "clothing", "garment", "jewellery", "jewelry",
            "cosmetic", "beauty",
        ],
    ),
    ("Retail", &["retail", "store", "shop", "e-commerce", "ecommerce"]),
    (
        "Services",
        &[
            "software", "it services", "web design", "web development", "digital marketing",
            "seo", "agency", "saas",
        ],
    ),
    ("Tech", &["ai", "ml", "data", "cloud", "cybersecurity", "devops", "platform"]),
    (
        "FinTech",
        &["fintech", "payments", "lending", "neo bank", "neobank", "credit", "insurance"],
    ),
    ("Healthcare", &["health", "clinic", "hospital", "care", "pharma", "wellness"]),
    (
        "Education",
        &["education", "edtech", "coaching", "training", "school", "college", "tuition"],
    ),
    (
        "Automotive",
        &["automobile", "auto", "car", "bike", "showroom", "dealership"],
    ),
];

type RoleRule = (&'static [&'static str], &'static str, &'static str);

/// Known brands and strong domain words.
const BRAND_HINTS: &[RoleRule] = &[
    (
        &["razorpay", "innoviti", "paytm", "cashfree"],
        "FinTech - Payments",
        "Payment gateway / digital payments",
    ),
    (
        &["scripbox", "groww", "zerodha", "wealth"],
        "WealthTech",
        "Investing / wealth management platform",
    ),
    (
        &["coinswitch", "coin dcx", "crypto"],
        "Crypto Exchange",
        "Digital asset trading platform",
    ),
    (
        &["byju", "cuemath", "unacademy", "vedantu", "edtech", "learn", "education"],
        "EdTech",
        "Online learning / education technology",
    ),
    (
        &["pristyn", "health", "clinic", "care", "med", "wellness", "telemed"],
        "HealthTech",
        "Healthcare services / benefits / telemedicine",
    ),
    (
        &["swiggy", "zomato", "food delivery", "deliveries"],
        "Food Delivery",
        "Online food ordering & delivery",
    ),
    (
        &["livspace", "interior"],
        "Interiors/Design",
        "Home interior design & installation",
    ),
    (
        &["fashinza", "apparel", "garment", "fashion", "boutique"],
        "Fashion Supply Chain",
        "B2B fashion/manufacturing platform",
    ),
    (
        &["rentomojo", "rento", "rent", "furniture"],
        "Rental/PropTech",
        "Furniture & appliance rentals",
    ),
    (
        &["bluestone", "jewel", "jewellery", "jewelry"],
        "Jewelry E-commerce",
        "Online D2C jewelry brand",
    ),
    (
        &["myglamm", "beauty", "makeup", "cosmetic"],
        "Beauty D2C",
        "Beauty & personal care D2C",
    ),
    (
        &["perfios", "credit analytics", "bureau"],
        "FinTech - Credit Analytics",
        "Credit decisioning & analytics SaaS",
    ),
    (
        &["increff", "supply chain", "inventory", "warehouse"],
        "B2B SaaS - Supply Chain",
        "Inventory/fulfillment optimization SaaS",
    ),
];

/// Broad fallbacks once no brand hint matched.
const GENERIC_HINTS: &[RoleRule] = &[
    (
        &["payment", "upi", "wallet", "lending", "neobank", "insurance", "insurtech", "credit"],
        "FinTech",
        "Financial technology services",
    ),
    (
        &["saas", "crm", "erp", "platform", "analytics", "billing", "pos", "hrms", "ats"],
        "B2B SaaS",
        "Software platform / SaaS",
    ),
    (
        &["ecommerce", "e-commerce", "marketplace", "store", "shop"],
        "E-commerce",
        "Online commerce / marketplace",
    ),
    (
        &["restaurant", "cafe", "bistro", "kitchen", "diner"],
        "Restaurants",
        "Dine-in / QSR / cloud kitchen",
    ),
    (
        &["logistics", "delivery", "courier", "freight"],
        "Logistics",
        "Logistics & delivery services",
    ),
];

/// Venture type for free text (category, industry, product line), if any keyword hits.
pub fn derive_venture_type(text: &str) -> Option<&'static str> {
    let t = text.to_lowercase();
    if t.trim().is_empty() {
        return None;
    }
    VENTURE_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| t.contains(w)))
        .map(|(venture, _)| *venture)
}

/// Sales-facing role and services blurb guessed from name, industry and website.
pub fn classify_role_services(
    name: &str,
    industry: &str,
    website: &str,
) -> Option<(&'static str, &'static str)> {
    let blob = format!("{} {} {}", name, industry, website).to_lowercase();
    BRAND_HINTS
        .iter()
        .chain(GENERIC_HINTS)
        .find(|(words, _, _)| words.iter().any(|w| blob.contains(w)))
        .map(|(_, role, services)| (*role, *services))
}

/// Venture type used when nothing could be derived for a source.
pub fn default_venture(source: &str) -> Option<&'static str> {
    match source {
        "topstartups" => Some("Tech"),
        "google_maps" => Some("Services"),
        "indiamart" | "tradeindia" => Some("B2B"),
        "producthunt" => Some("Tech"),
        "justdial" => Some("Restaurants"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_venture_precedence() {
        assert_eq!(derive_venture_type("Coffee roasters"), Some("Restaurants"));
        assert_eq!(derive_venture_type("Boutique hotel"), Some("Hospitality"));
        assert_eq!(derive_venture_type("Bridal Boutique"), Some("Fashion"));
        assert_eq!(derive_venture_type("SEO consultancy"), Some("Services"));
        assert_eq!(derive_venture_type("Neobank"), Some("FinTech"));
        assert_eq!(derive_venture_type(""), None);
        assert_eq!(derive_venture_type("Plumbing"), None);
    }

    #[test]
    fn test_brand_hint_beats_generic() {
        assert_eq!(
            classify_role_services("Razorpay", "Payments platform", ""),
            Some(("FinTech - Payments", "Payment gateway / digital payments"))
        );
        assert_eq!(
            classify_role_services("Acme", "CRM", "acme.io"),
            Some(("B2B SaaS", "Software platform / SaaS"))
        );
        assert_eq!(
            classify_role_services("Shipfast", "Courier", ""),
            Some(("Logistics", "Logistics & delivery services"))
        );
        assert_eq!(classify_role_services("Zqx", "", ""), None);
    }

    #[test]
    fn test_default_venture() {
        assert_eq!(default_venture("indiamart"), Some("B2B"));
        assert_eq!(default_venture("yc_directory"), None);
    }
}
