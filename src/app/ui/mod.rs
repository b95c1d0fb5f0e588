mod controls;
mod panels;
mod popup;
