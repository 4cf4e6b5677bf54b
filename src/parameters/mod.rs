// Parameter Discovery Module
//
// Produces the injectable parameter names a scan probes.
//
// - discovery: the ParameterDiscoverer contract and the fixed-candidate
//   implementation used until a crawling discoverer is plugged in
//
// The orchestrator calls discover() once per scan and hands the same
// ParameterSet to every detector.

pub mod discovery;

pub use discovery::*;
