// geometry module
pub mod geometry {
    pub mod wafer;
    pub mod layout;
}

// data module
pub mod data {
    pub mod cluster;
    pub mod cluster_set;
}

// algorithm module
pub mod algorithm {
    pub mod linear_fit;
}
