/*!
Clifford gates as permutation-with-sign tables over Pauli strings.

A Clifford gate maps every Pauli on its support to a single Pauli with a sign,
so it never branches. The tables live in a process-wide registry keyed by gate
symbol; they are built once from the images of the X and Z generators on each
site, closing over products with phase tracking. Propagation only reads the
[Arc] resolved at gate construction; the registry itself is touched again only
by (idempotent) registration, e.g., for transposed tables.
*/

use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use hashbrown::HashMap;

use crate::{
    gate::UnsupportedGate,
    pauli::{code::PauliCode, Phase},
};

/// The lookup table of a Clifford gate on `sites` qubits.
///
/// Entry `input` (the packed local Pauli mask, first site in the low two bits)
/// holds the image mask and whether the sign flips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliffordMap {
    sites: usize,
    images: Vec<(bool, u8)>,
}

impl CliffordMap {
    /// Build the full table from the images of the local X and Z generators.
    ///
    /// `generators` holds one `(sign flip, image mask)` entry per generator, in
    /// the order `X_0, …, X_{k-1}, Z_0, …, Z_{k-1}`. The remaining images follow
    /// by multiplicativity, with `Y = i X Z` per site.
    ///
    /// # Panics
    /// If the generator images are inconsistent (a Pauli image with an
    /// imaginary phase) or `2 * sites` exceeds the 8-bit local masks.
    pub fn from_generators(sites: usize, generators: &[(bool, u8)]) -> Self {
        assert!(sites * 2 <= u8::BITS as usize, "local masks are 8 bits");
        assert_eq!(generators.len(), 2 * sites, "two generators per site");
        let size = 1usize << (2 * sites);
        let mut images = Vec::with_capacity(size);
        for input in 0..size {
            let mut phase = Phase::ONE;
            let mut mask = 0u8;
            for site in 0..sites {
                let code = (input >> (2 * site)) & 3;
                let (lo, hi) = (code & 1, code >> 1);
                if code == 2 {
                    // Y = i X Z
                    phase = phase.times_i();
                }
                if lo ^ hi == 1 {
                    phase = Self::multiply(&mut mask, generators[site], phase);
                }
                if hi == 1 {
                    phase = Self::multiply(&mut mask, generators[sites + site], phase);
                }
            }
            assert!(phase.is_real(), "inconsistent generator images");
            images.push((phase == Phase::MINUS_ONE, mask));
        }
        Self { sites, images }
    }

    fn multiply(mask: &mut u8, image: (bool, u8), mut phase: Phase) -> Phase {
        let (negative, generator_image) = image;
        if negative {
            phase = phase.times(Phase::MINUS_ONE);
        }
        let (product_phase, product) = mask.product(&generator_image);
        *mask = product;
        phase.times(product_phase)
    }

    /// The number of sites the gate acts on.
    pub fn sites(&self) -> usize {
        self.sites
    }

    /// The image of the packed local Pauli `input`.
    #[inline]
    pub fn image(&self, input: usize) -> (bool, u8) {
        self.images[input]
    }

    /// The transposed table: the inverse permutation with unchanged signs.
    pub fn transposed(&self) -> Self {
        let mut images = vec![(false, 0u8); self.images.len()];
        for (input, &(negative, image)) in self.images.iter().enumerate() {
            images[image as usize] = (negative, input as u8);
        }
        Self { sites: self.sites, images }
    }
}

static REGISTRY: LazyLock<RwLock<HashMap<String, Arc<CliffordMap>>>> =
    LazyLock::new(|| RwLock::new(builtin_maps()));

const X: u8 = 1;
const Y: u8 = 2;
const Z: u8 = 3;

fn two(first: u8, second: u8) -> u8 {
    first | (second << 2)
}

fn builtin_maps() -> HashMap<String, Arc<CliffordMap>> {
    let mut maps = HashMap::new();
    let singles: [(&str, [(bool, u8); 2]); 7] = [
        ("H", [(false, Z), (false, X)]),
        ("X", [(false, X), (true, Z)]),
        ("Y", [(true, X), (true, Z)]),
        ("Z", [(true, X), (false, Z)]),
        ("S", [(true, Y), (false, Z)]),
        ("SX", [(false, X), (false, Y)]),
        ("SY", [(false, Z), (true, X)]),
    ];
    for (symbol, generators) in singles {
        maps.insert(symbol.to_owned(), Arc::new(CliffordMap::from_generators(1, &generators)));
    }
    let doubles: [(&str, [(bool, u8); 4]); 4] = [
        (
            "CNOT",
            [
                (false, two(X, X)),
                (false, two(0, X)),
                (false, two(Z, 0)),
                (false, two(Z, Z)),
            ],
        ),
        (
            "CZ",
            [
                (false, two(X, Z)),
                (false, two(Z, X)),
                (false, two(Z, 0)),
                (false, two(0, Z)),
            ],
        ),
        (
            "SWAP",
            [
                (false, two(0, X)),
                (false, two(X, 0)),
                (false, two(0, Z)),
                (false, two(Z, 0)),
            ],
        ),
        (
            "ZZpihalf",
            [
                (true, two(Y, Z)),
                (true, two(Z, Y)),
                (false, two(Z, 0)),
                (false, two(0, Z)),
            ],
        ),
    ];
    for (symbol, generators) in doubles {
        maps.insert(symbol.to_owned(), Arc::new(CliffordMap::from_generators(2, &generators)));
    }
    maps
}

/// Look up a registered Clifford table by symbol.
pub fn lookup(symbol: &str) -> Option<Arc<CliffordMap>> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(symbol)
        .cloned()
}

/// Register a Clifford table under `symbol`.
///
/// Registration is idempotent: if the symbol is already taken, the existing
/// table is kept and returned.
pub fn register(symbol: impl Into<String>, map: CliffordMap) -> Arc<CliffordMap> {
    REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(symbol.into())
        .or_insert_with(|| Arc::new(map))
        .clone()
}

/// A Clifford gate: a registered table applied at fixed sites.
#[derive(Debug, Clone)]
pub struct CliffordGate {
    symbol: String,
    sites: Vec<usize>,
    map: Arc<CliffordMap>,
}

impl CliffordGate {
    /// Resolve `symbol` in the registry and bind it to `sites`.
    pub fn new(symbol: &str, sites: Vec<usize>) -> Result<Self, UnsupportedGate> {
        let map = lookup(symbol).ok_or_else(|| UnsupportedGate(symbol.to_owned()))?;
        if map.sites() != sites.len() || !distinct(&sites) {
            return Err(UnsupportedGate(format!(
                "{symbol} acts on {} distinct sites, got {:?}",
                map.sites(),
                sites
            )));
        }
        Ok(Self { symbol: symbol.to_owned(), sites, map })
    }

    /// The gate symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// The sites the gate acts on.
    pub fn sites(&self) -> &[usize] {
        &self.sites
    }

    /// Rewrite the Pauli `code` in place, returning the sign of the image.
    #[inline]
    pub fn conjugate<B: PauliCode>(&self, code: &mut B) -> f64 {
        let (negative, image) = self.map.image(code.extract(&self.sites));
        code.deposit(image as usize, &self.sites);
        if negative { -1.0 } else { 1.0 }
    }

    /// The same gate with the transposed table (registered on first use).
    pub fn transposed(&self) -> Self {
        // the transpose of a transpose resolves back to the base symbol
        let (symbol, map) = match self.symbol.strip_suffix("^T") {
            Some(base) => (base.to_owned(), register(base, self.map.transposed())),
            None => {
                let symbol = format!("{}^T", self.symbol);
                (symbol.clone(), register(symbol, self.map.transposed()))
            },
        };
        Self { symbol, sites: self.sites.clone(), map }
    }
}

fn distinct(sites: &[usize]) -> bool {
    sites.iter().enumerate().all(|(i, a)| sites[..i].iter().all(|b| a != b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pauli::Pauli;

    fn single_action(symbol: &str, input: Pauli) -> (f64, Pauli) {
        let gate = CliffordGate::new(symbol, vec![0]).unwrap();
        let mut code = 0u8;
        code.set(0, input);
        let sign = gate.conjugate(&mut code);
        (sign, code.get(0))
    }

    #[test]
    fn single_site_tables() {
        use Pauli::{I, X, Y, Z};
        // (symbol, images of [I, X, Y, Z])
        let expected = [
            ("H", [(1.0, I), (1.0, Z), (-1.0, Y), (1.0, X)]),
            ("X", [(1.0, I), (1.0, X), (-1.0, Y), (-1.0, Z)]),
            ("Y", [(1.0, I), (-1.0, X), (1.0, Y), (-1.0, Z)]),
            ("Z", [(1.0, I), (-1.0, X), (-1.0, Y), (1.0, Z)]),
            ("S", [(1.0, I), (-1.0, Y), (1.0, X), (1.0, Z)]),
            ("SX", [(1.0, I), (1.0, X), (-1.0, Z), (1.0, Y)]),
            ("SY", [(1.0, I), (1.0, Z), (1.0, Y), (-1.0, X)]),
        ];
        for (symbol, images) in expected {
            for (input, expected) in [I, X, Y, Z].into_iter().zip(images) {
                assert_eq!(single_action(symbol, input), expected, "{symbol}({input})");
            }
        }
    }

    fn double_action(symbol: &str, first: Pauli, second: Pauli) -> (f64, Pauli, Pauli) {
        let gate = CliffordGate::new(symbol, vec![0, 1]).unwrap();
        let mut code = 0u8;
        code.set(0, first);
        code.set(1, second);
        let sign = gate.conjugate(&mut code);
        (sign, code.get(0), code.get(1))
    }

    #[test]
    fn cnot_table() {
        use Pauli::{I, X, Y, Z};
        let expected = [
            ((X, I), (1.0, X, X)),
            ((I, X), (1.0, I, X)),
            ((Z, I), (1.0, Z, I)),
            ((I, Z), (1.0, Z, Z)),
            ((Y, I), (1.0, Y, X)),
            ((I, Y), (1.0, Z, Y)),
            ((X, X), (1.0, X, I)),
            ((Y, Y), (-1.0, X, Z)),
            ((Z, Z), (1.0, I, Z)),
            ((X, Z), (-1.0, Y, Y)),
        ];
        for ((first, second), image) in expected {
            assert_eq!(double_action("CNOT", first, second), image, "CNOT({first}{second})");
        }
    }

    #[test]
    fn cz_and_swap_tables() {
        use Pauli::{I, X, Y, Z};
        assert_eq!(double_action("CZ", X, I), (1.0, X, Z));
        assert_eq!(double_action("CZ", I, X), (1.0, Z, X));
        assert_eq!(double_action("CZ", X, X), (1.0, Y, Y));
        assert_eq!(double_action("CZ", Z, Y), (1.0, I, Y));
        assert_eq!(double_action("SWAP", X, Z), (1.0, Z, X));
        assert_eq!(double_action("SWAP", I, Y), (1.0, Y, I));
    }

    #[test]
    fn zz_pihalf_table() {
        use Pauli::{I, X, Y, Z};
        assert_eq!(double_action("ZZpihalf", X, I), (-1.0, Y, Z));
        assert_eq!(double_action("ZZpihalf", I, X), (-1.0, Z, Y));
        assert_eq!(double_action("ZZpihalf", Y, I), (1.0, X, Z));
        assert_eq!(double_action("ZZpihalf", Z, Z), (1.0, Z, Z));
        assert_eq!(double_action("ZZpihalf", X, Z), (-1.0, Y, I));
    }

    #[test]
    fn transpose_inverts() {
        for symbol in ["H", "S", "SX", "SY", "CNOT", "CZ", "SWAP", "ZZpihalf"] {
            let map = lookup(symbol).unwrap();
            let transposed = map.transposed();
            for input in 0..map.images.len() {
                let (sign, image) = map.image(input);
                let (back_sign, back) = transposed.image(image as usize);
                assert_eq!(back as usize, input, "{symbol}");
                assert_eq!(sign, back_sign, "{symbol}");
            }
        }
    }

    #[test]
    fn registration_is_idempotent() {
        let custom = CliffordMap::from_generators(1, &[(false, Z), (false, X)]);
        let first = register("custom_hadamard", custom.clone());
        let second = register("custom_hadamard", custom);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn unknown_symbol() {
        assert!(CliffordGate::new("XXZZ", vec![0, 1]).is_err());
        assert!(CliffordGate::new("CNOT", vec![1, 1]).is_err());
        assert!(CliffordGate::new("CNOT", vec![0]).is_err());
    }
}
