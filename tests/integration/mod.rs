//! Integration Tests Module
//!
//! End-to-end tests for the assistant: full conversation turns against a
//! scripted model provider and the in-memory gateway, and the milestone
//! planner over realistic issue sets.

// Shared fixtures and the scripted provider
mod support;

// Agentic loop, approval flow, degradation and guard tests
mod orchestrator_test;

// Milestone planner scenario tests
mod planner_test;
