//! Tastypie OpenAPI - OpenAPI 3.0 documentation for Tastypie-style REST APIs.
//!
//! Resources are described by metadata (name, fields, filtering, ordering, allowed
//! methods, extra actions) and grouped under named Apis. From that metadata this
//! library derives every endpoint a resource exposes and assembles one OpenAPI
//! document, which can be printed, served behind a Swagger UI page or compiled
//! into a static docs directory.
//!
//! # Architecture
//!
//! 1. [`resource`] - Resource metadata and field types
//! 2. [`registry`] - Named Apis and the registry files that populate them
//! 3. [`mapping`] - Per-resource derivation of paths, operations and parameters
//! 4. [`schema_generator`] - Component schemas for list, create and update bodies
//! 5. [`openapi_builder`] - Constructs the complete OpenAPI document
//! 6. [`serializer`] - Serializes the document to YAML or JSON
//! 7. [`settings`] - The settings file
//! 8. [`template`], [`server`], [`build_docs`] - The Swagger UI page, served or built
//!
//! # Example Usage
//!
//! ```no_run
//! use tastypie_openapi::{
//!     openapi_builder::{Info, OpenApiBuilder},
//!     registry::load_registry,
//!     serializer::serialize_json,
//! };
//! use std::path::Path;
//!
//! let apis = load_registry(Path::new("registry.yaml")).unwrap();
//!
//! let mut builder = OpenApiBuilder::new(Info::new("Library", "1.0"))
//!     .with_server("http://localhost:8000/");
//! for api in &apis {
//!     builder.add_api(api);
//! }
//!
//! println!("{}", serialize_json(&builder.build()).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod build_docs;
pub mod cli;
pub mod error;
pub mod mapping;
pub mod openapi_builder;
pub mod registry;
pub mod resource;
pub mod schema_generator;
pub mod serializer;
pub mod server;
pub mod settings;
pub mod template;
