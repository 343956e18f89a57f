//! Wire shapes and their conversions to and from the domain.
//!
//! A request DTO turns into exactly one domain value; a response DTO is built
//! from exactly one. Conversions are pure: no I/O, no side effects.

pub mod actuator;
pub mod echo;

pub use actuator::{HealthResponse, InfoResponse, LogsQuery, LogsResponse, ReadinessResponse};
pub use echo::{EchoRequest, EchoResponse};

pub trait RequestDto {
    type Domain;

    fn to_domain(self) -> Self::Domain;
}

pub trait ResponseDto: Sized {
    type Domain;

    fn from_domain(domain: Self::Domain) -> Self;

    fn from_domain_optional(domain: Option<Self::Domain>) -> Option<Self> {
        domain.map(Self::from_domain)
    }

    fn from_domain_list<I>(domains: I) -> Vec<Self>
    where
        I: IntoIterator<Item = Self::Domain>,
    {
        domains.into_iter().map(Self::from_domain).collect()
    }

    /// Convert every value of a keyed collection, keeping the keys.
    ///
    /// The output collection type is chosen by the caller (`HashMap`,
    /// `BTreeMap`, ...).
    fn from_domain_map<K, I, C>(domains: I) -> C
    where
        I: IntoIterator<Item = (K, Self::Domain)>,
        C: FromIterator<(K, Self)>,
    {
        domains
            .into_iter()
            .map(|(key, domain)| (key, Self::from_domain(domain)))
            .collect()
    }
}
