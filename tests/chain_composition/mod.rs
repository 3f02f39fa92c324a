mod registry;
mod stacks;
