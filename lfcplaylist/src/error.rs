//! Types d'erreurs pour lfcplaylist

/// Erreurs de gestion de playlist
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Reorder rejected: ids are not a permutation of the current playlist")]
    NotAPermutation,
}

/// Type Result spécialisé pour lfcplaylist
pub type Result<T> = std::result::Result<T, Error>;
