// Farmer name generation

use crate::rng::SimRng;

static FIRST_NAMES: &[&str] = &[
    "Ada", "Alder", "Amos", "Anna", "Arlo", "Basil", "Bea", "Bram", "Cora", "Cyrus",
    "Della", "Dorian", "Edda", "Elias", "Elsie", "Ezra", "Faye", "Felix", "Greta", "Gideon",
    "Hale", "Hazel", "Ida", "Ivo", "Jonah", "June", "Kit", "Lena", "Linus", "Mabel",
    "Milo", "Nell", "Odo", "Opal", "Otto", "Pearl", "Quill", "Rosa", "Rowan", "Silas",
    "Tess", "Theo", "Una", "Vera", "Wade", "Wren", "Yara", "Zeb",
];

static LAST_NAMES: &[&str] = &[
    "Ashby", "Barrow", "Bell", "Birch", "Brook", "Carver", "Cobb", "Crane", "Dale", "Drake",
    "Fairweather", "Fenn", "Fletcher", "Ford", "Gale", "Garner", "Hale", "Harrow", "Hollis", "Holt",
    "Kettle", "Lane", "Marsh", "Meadows", "Miller", "Moss", "Nash", "Orchard", "Pike", "Reed",
    "Rook", "Rye", "Sawyer", "Shepherd", "Stone", "Thatcher", "Thorne", "Tiller", "Vale", "Voss",
    "Ward", "Weaver", "Wells", "Whitlock", "Wilde", "Yarrow",
];

fn pick(rng: &mut SimRng, options: &[&'static str]) -> &'static str {
    let idx = ((rng.uniform() * options.len() as f64) as usize).min(options.len() - 1);
    options[idx]
}

/// "First Last", two draws.
pub fn full_name(rng: &mut SimRng) -> String {
    let first = pick(rng, FIRST_NAMES);
    let last = pick(rng, LAST_NAMES);
    format!("{} {}", first, last)
}
