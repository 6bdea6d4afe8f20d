// Funeral Hub BDD Tests
//
// Feature files live in `features/`; the world and step definitions live in
// `steps/` and are compiled into the `bdd` test binary.
