use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not open the index database")]
    Database,
    #[display("could not read the catalog")]
    Catalog,
    #[display("map index error")]
    Index,
    #[display("replay monitoring failed")]
    Watch,
    #[display("no beatmap indexed for {_0}")]
    UnknownHash(#[error(not(source))] String),
    #[display("could not listen for shutdown")]
    Signal,
}
