use rand::Rng;

const REFERENCE_LEN: usize = 8;

/// Source of the `reference` tag attached to every placed order.
pub trait ReferenceGenerator: Send + Sync {
    fn next_reference(&self) -> String;
}

/// Eight random lowercase hex characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomReference;

impl ReferenceGenerator for RandomReference {
    fn next_reference(&self) -> String {
        let mut rng = rand::rng();
        (0..REFERENCE_LEN)
            .map(|_| char::from_digit(rng.random_range(0..16), 16).unwrap_or('0'))
            .collect()
    }
}

/// Always the same reference. Useful where request bodies are compared.
#[derive(Debug, Clone)]
pub struct FixedReference(pub String);

impl ReferenceGenerator for FixedReference {
    fn next_reference(&self) -> String {
        self.0.clone()
    }
}
