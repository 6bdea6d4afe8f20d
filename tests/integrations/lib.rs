// Funeral Hub Integration Tests
//
// Engine integration tests over the in-memory store. Each file under this
// directory is its own test target.
