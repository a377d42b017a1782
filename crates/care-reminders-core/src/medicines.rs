//! Medicine name suggestions for data entry.

/// Default catalog offered while typing a medicine name.
pub const COMMON_MEDICINES: &[&str] = &[
    "Acetaminophen",
    "Albuterol",
    "Allopurinol",
    "Alprazolam",
    "Amlodipine",
    "Amoxicillin",
    "Aspirin",
    "Atenolol",
    "Atorvastatin",
    "Azithromycin",
    "Carvedilol",
    "Cetirizine",
    "Ciprofloxacin",
    "Citalopram",
    "Clopidogrel",
    "Donepezil",
    "Escitalopram",
    "Furosemide",
    "Gabapentin",
    "Glipizide",
    "Hydrochlorothiazide",
    "Ibuprofen",
    "Insulin Glargine",
    "Levothyroxine",
    "Lisinopril",
    "Loratadine",
    "Losartan",
    "Metformin",
    "Metoprolol",
    "Montelukast",
    "Naproxen",
    "Omeprazole",
    "Pantoprazole",
    "Prednisone",
    "Rosuvastatin",
    "Sertraline",
    "Simvastatin",
    "Tamsulosin",
    "Tramadol",
    "Vitamin B12",
    "Vitamin D3",
    "Warfarin",
];

/// Catalog entries containing `query` (case-insensitive), in catalog order,
/// at most `limit`. An empty query suggests nothing.
pub fn suggest_medicines<'a, S: AsRef<str>>(catalog: &'a [S], query: &str, limit: usize) -> Vec<&'a str> {
    if query.is_empty() {
        return Vec::new();
    }

    let query = query.to_lowercase();
    catalog
        .iter()
        .map(|name| name.as_ref())
        .filter(|name: &&str| name.to_lowercase().contains(&query))
        .take(limit)
        .collect()
}
