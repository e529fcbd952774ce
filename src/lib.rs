// Click-to-move navigation for a single agent on an isometric or top-down grid
// See DESIGN.md for the component breakdown

pub mod engine;
