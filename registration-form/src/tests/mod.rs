mod register_form_test;
