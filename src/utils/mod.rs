pub(crate) mod subprocess;
